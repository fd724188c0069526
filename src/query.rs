use crate::error::{Error, Result};
use crate::iter::{KnnIter, RangeIter};
use crate::kdtree::{KdTree, NodeKind};
use crate::points::PointStorage;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A subtree waiting on the traversal stack, with the lower bound of its
/// squared distance to the query point.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Pending {
    pub node: u32,
    pub dist_sq: f64,
}

/// A k-NN candidate. Candidates are ordered by squared distance, then by
/// point index, so equal distances resolve to the lower index.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Candidate {
    pub dist_sq: f64,
    pub index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then(self.index.cmp(&other.index))
    }
}

#[inline]
pub(crate) fn dist_sq<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    let mut sum = 0.0;
    for i in 0..D {
        let d = a[i] - b[i];
        sum += d * d;
    }
    sum
}

/// Orders the children of an internal node: the one on the query's side of
/// the split plane first.
#[inline]
pub(crate) fn near_far<const D: usize>(point: &[f64; D], axis: usize, split: f64, left: u32, right: u32) -> (u32, u32) {
    if point[axis] <= split { (left, right) } else { (right, left) }
}

/// Depth-first k-NN search with a bounded max-heap of the best `k` candidates.
///
/// A subtree is skipped once the heap is full and its box lies strictly
/// farther than the current k-th candidate; an equally distant subtree may
/// still hold a lower index and is visited. Returns candidates in ascending
/// order.
pub(crate) fn knn_search<S, const D: usize>(
    tree: &KdTree<S, D>,
    point: &[f64; D],
    k: usize,
    exclude: Option<usize>,
) -> Vec<Candidate>
where
    S: PointStorage<D>,
{
    let Some(root) = tree.root() else {
        return Vec::new();
    };

    let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k.min(tree.len()));
    let mut stack = vec![Pending {
        node: root,
        dist_sq: tree.node(root).bounds().min_dist_sq(point),
    }];

    let worst = |heap: &BinaryHeap<Candidate>| -> f64 {
        if heap.len() < k {
            f64::INFINITY
        } else {
            heap.peek().map_or(f64::INFINITY, |c| c.dist_sq)
        }
    };

    while let Some(Pending { node, dist_sq: bound }) = stack.pop() {
        // The heap may have tightened since this subtree was pushed
        if bound > worst(&heap) {
            continue;
        }

        match tree.node(node).kind() {
            NodeKind::Leaf { start, end } => {
                for &idx in &tree.indices()[start as usize..end as usize] {
                    if exclude == Some(idx) {
                        continue;
                    }
                    let candidate = Candidate {
                        dist_sq: dist_sq(&tree.storage().point(idx), point),
                        index: idx,
                    };
                    if heap.len() < k {
                        heap.push(candidate);
                    } else if let Some(mut top) = heap.peek_mut() {
                        if candidate < *top {
                            *top = candidate;
                        }
                    }
                }
            }
            NodeKind::Internal { axis, split, left, right } => {
                let (near, far) = near_far(point, axis, split, left, right);
                // Pushed far first so the near child is popped first
                for child in [far, near] {
                    let d2 = tree.node(child).bounds().min_dist_sq(point);
                    if d2 <= worst(&heap) {
                        stack.push(Pending { node: child, dist_sq: d2 });
                    }
                }
            }
        }
    }

    heap.into_sorted_vec()
}

fn check_radius(radius: f64) -> Result<()> {
    if !(radius >= 0.0) {
        return Err(Error::invalid(format!("radius must be non-negative, got {}", radius)));
    }
    Ok(())
}

fn check_k(k: usize) -> Result<()> {
    if k < 1 {
        return Err(Error::invalid("k must be at least 1"));
    }
    Ok(())
}

impl<S: PointStorage<D>, const D: usize> KdTree<S, D> {
    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.storage().len() {
            return Err(Error::invalid(format!(
                "point index {} outside storage of {} points",
                index,
                self.storage().len()
            )));
        }
        Ok(())
    }

    /// Lazily enumerates every indexed point within `radius` of `point`,
    /// boundary included. Results come in no particular order.
    ///
    /// Fails with [`Error::InvalidInput`] if `radius` is negative or NaN.
    pub fn range_query(&self, point: &[f64; D], radius: f64) -> Result<RangeIter<'_, S, D>> {
        check_radius(radius)?;
        Ok(RangeIter::new(self, *point, radius, None))
    }

    /// Like [`range_query`](Self::range_query) around the stored point
    /// `index`, which is itself left out of the results.
    pub fn range_index_query(&self, index: usize, radius: f64) -> Result<RangeIter<'_, S, D>> {
        check_radius(radius)?;
        self.check_index(index)?;
        Ok(RangeIter::new(self, self.storage().point(index), radius, Some(index)))
    }

    /// Enumerates the `k` indexed points nearest to `point` (all of them if
    /// fewer than `k` are indexed) in ascending distance. Equal distances are
    /// ordered by point index.
    ///
    /// Fails with [`Error::InvalidInput`] if `k` is zero.
    pub fn knn_query(&self, point: &[f64; D], k: usize) -> Result<KnnIter<'_, S, D>> {
        check_k(k)?;
        Ok(KnnIter::new(self, *point, k, None))
    }

    /// Like [`knn_query`](Self::knn_query) around the stored point `index`,
    /// which is itself left out of the results.
    pub fn knn_index_query(&self, index: usize, k: usize) -> Result<KnnIter<'_, S, D>> {
        check_k(k)?;
        self.check_index(index)?;
        Ok(KnnIter::new(self, self.storage().point(index), k, Some(index)))
    }

    /// Single nearest neighbor query, as an iterator of at most one index.
    pub fn nearest_query(&self, point: &[f64; D]) -> KnnIter<'_, S, D> {
        KnnIter::new(self, *point, 1, None)
    }

    /// Index of the nearest indexed point, `None` for an empty tree.
    pub fn nearest(&self, point: &[f64; D]) -> Option<usize> {
        knn_search(self, point, 1, None).first().map(|c| c.index)
    }

    /// Nearest indexed point other than the stored point `index`.
    pub fn nearest_index(&self, index: usize) -> Result<Option<usize>> {
        self.check_index(index)?;
        let point = self.storage().point(index);
        Ok(knn_search(self, &point, 1, Some(index)).first().map(|c| c.index))
    }
}

impl<S: PointStorage<D> + Sync, const D: usize> KdTree<S, D> {
    /// Runs one k-NN query per entry of `points` on the rayon pool.
    pub fn par_knn(&self, points: &[[f64; D]], k: usize) -> Result<Vec<Vec<usize>>> {
        check_k(k)?;
        Ok(points
            .par_iter()
            .map(|p| knn_search(self, p, k, None).into_iter().map(|c| c.index).collect::<Vec<_>>())
            .collect())
    }

    /// Runs one range query per entry of `points` on the rayon pool.
    pub fn par_range(&self, points: &[[f64; D]], radius: f64) -> Result<Vec<Vec<usize>>> {
        check_radius(radius)?;
        Ok(points
            .par_iter()
            .map(|p| RangeIter::new(self, *p, radius, None).collect::<Vec<_>>())
            .collect())
    }
}
