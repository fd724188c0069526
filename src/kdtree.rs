use crate::bounds::BoundingBox;
use crate::config::KdTreeConfig;
use crate::error::{Error, Result};
use crate::points::PointStorage;
use crate::timing::Timed;

/// Payload of a tree node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeKind {
    /// Splits its points at `split` along `axis`. `left` and `right` are arena
    /// offsets of the children.
    Internal {
        axis: usize,
        split: f64,
        left: u32,
        right: u32,
    },
    /// Leaf data: `indices[start..end]`.
    Leaf { start: u32, end: u32 },
}

/// A node of the flat arena, with the bounding box of every point below it.
#[derive(Clone, Copy, Debug)]
pub struct KdNode<const D: usize> {
    bounds: BoundingBox<D>,
    kind: NodeKind,
}

impl<const D: usize> KdNode<D> {
    pub fn bounds(&self) -> &BoundingBox<D> {
        &self.bounds
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }
}

/// Shape summary of a built tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Total number of nodes in the arena.
    pub nodes: usize,
    /// Number of leaf nodes.
    pub leaves: usize,
    /// Number of edges on the longest root-to-leaf path.
    pub depth: usize,
    /// Largest number of points held by a single leaf.
    pub max_leaf_len: usize,
}

/// A balanced k-d tree over the points of a [`PointStorage`].
///
/// The tree keeps a permutation of point indices so that every node covers a
/// contiguous run of it, plus a flat arena of nodes addressed by offset. The
/// positions themselves stay in the storage: pass a reference
/// (`KdTree::build(&points, 16)`) to keep ownership with the caller, in which
/// case the tree cannot outlive the points.
///
/// A built tree is immutable. It can be shared between threads and queried
/// concurrently; each query owns its own traversal state.
pub struct KdTree<S, const D: usize> {
    storage: S,
    nodes: Vec<KdNode<D>>,
    indices: Vec<usize>,
    root: Option<u32>,
    leaf_size: usize,
}

impl<S: PointStorage<D>, const D: usize> KdTree<S, D> {
    /// Builds a tree over every point of `storage` with at most `leaf_size`
    /// points per leaf.
    ///
    /// An empty storage yields an empty tree, not an error.
    pub fn build(storage: S, leaf_size: usize) -> Result<Self> {
        Self::with_config(storage, KdTreeConfig::default().with_leaf_size(leaf_size))
    }

    pub fn with_config(storage: S, config: KdTreeConfig) -> Result<Self> {
        config.validate()?;
        let indices = (0..storage.len()).collect();
        Self::from_indices(storage, indices, config)
    }

    /// Builds a tree over the subset `sampling` of the storage. Queries only
    /// ever report indices from `sampling`.
    pub fn with_sampling(storage: S, sampling: Vec<usize>, config: KdTreeConfig) -> Result<Self> {
        config.validate()?;
        let total = storage.len();
        let mut seen = vec![false; total];
        for &idx in &sampling {
            if idx >= total {
                return Err(Error::invalid(format!(
                    "sampling index {} outside storage of {} points",
                    idx, total
                )));
            }
            if seen[idx] {
                return Err(Error::invalid(format!("sampling index {} appears twice", idx)));
            }
            seen[idx] = true;
        }
        Self::from_indices(storage, sampling, config)
    }

    fn from_indices(storage: S, indices: Vec<usize>, config: KdTreeConfig) -> Result<Self> {
        if D == 0 {
            return Err(Error::invalid("points must have at least one dimension"));
        }
        let count = indices.len();
        check_capacity(count, config.leaf_size)?;

        let _t = Timed::debug("kd-tree build");
        let mut tree = KdTree {
            storage,
            nodes: Vec::new(),
            indices,
            root: None,
            leaf_size: config.leaf_size,
        };

        if count > 0 {
            // A balanced tree has about 2 * N / L nodes
            tree.nodes.reserve(2 * count.div_ceil(tree.leaf_size));
            let root = tree.build_recursive(0, count);
            tree.root = Some(root);
        }

        let stats = tree.stats();
        log::debug!(
            "kd-tree over {} points: {} nodes, {} leaves, depth {}",
            count,
            stats.nodes,
            stats.leaves,
            stats.depth
        );
        Ok(tree)
    }

    fn build_recursive(&mut self, start: usize, end: usize) -> u32 {
        let count = end - start;
        let bounds = BoundingBox::from_indices(&self.storage, &self.indices[start..end]);

        if count <= self.leaf_size {
            return self.push(KdNode {
                bounds,
                kind: NodeKind::Leaf {
                    start: start as u32,
                    end: end as u32,
                },
            });
        }

        let axis = bounds.longest_axis();

        // Median split by rank: the left child gets ceil(count / 2) points, so
        // neither side is empty even when every coordinate is equal. Ties on
        // the coordinate are ordered by point index.
        let rank = count.div_ceil(2) - 1;
        let storage = &self.storage;
        self.indices[start..end].select_nth_unstable_by(rank, |&a, &b| {
            storage
                .coord(a, axis)
                .total_cmp(&storage.coord(b, axis))
                .then(a.cmp(&b))
        });
        let mid = start + rank + 1;
        let split = self.storage.coord(self.indices[start + rank], axis);

        let left = self.build_recursive(start, mid);
        let right = self.build_recursive(mid, end);

        self.push(KdNode {
            bounds,
            kind: NodeKind::Internal {
                axis,
                split,
                left,
                right,
            },
        })
    }

    fn push(&mut self, node: KdNode<D>) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(node);
        id
    }
}

impl<S, const D: usize> KdTree<S, D> {
    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The index permutation: leaf `[start, end)` ranges point into this slice.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn nodes(&self) -> &[KdNode<D>] {
        &self.nodes
    }

    /// Arena offset of the root, `None` for an empty tree.
    pub fn root(&self) -> Option<u32> {
        self.root
    }

    /// Bounding box of all indexed points.
    pub fn bounds(&self) -> Option<BoundingBox<D>> {
        self.root.map(|r| self.nodes[r as usize].bounds)
    }

    #[inline]
    pub(crate) fn node(&self, id: u32) -> &KdNode<D> {
        &self.nodes[id as usize]
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            nodes: self.nodes.len(),
            ..TreeStats::default()
        };
        let Some(root) = self.root else {
            return stats;
        };

        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            match self.node(id).kind {
                NodeKind::Leaf { start, end } => {
                    stats.leaves += 1;
                    stats.depth = stats.depth.max(depth);
                    stats.max_leaf_len = stats.max_leaf_len.max((end - start) as usize);
                }
                NodeKind::Internal { left, right, .. } => {
                    stack.push((left, depth + 1));
                    stack.push((right, depth + 1));
                }
            }
        }
        stats
    }
}

impl<S: PointStorage<D>, const D: usize> KdTree<S, D> {
    /// Checks the structural invariants of the tree.
    ///
    /// - the permutation holds distinct indices into the storage;
    /// - leaves are non-empty, hold at most `leaf_size` points, and together
    ///   cover `[0, len)` exactly once;
    /// - every bounding box contains the points below it;
    /// - every split value separates the two children along its axis.
    pub fn validate(&self) -> Result<()> {
        let total = self.storage.len();
        let mut seen = vec![false; total];
        for &idx in &self.indices {
            if idx >= total {
                return Err(violation(format!(
                    "permutation entry {} outside storage of {} points",
                    idx, total
                )));
            }
            if seen[idx] {
                return Err(violation(format!("point {} indexed twice", idx)));
            }
            seen[idx] = true;
        }

        let Some(root) = self.root else {
            if self.indices.is_empty() && self.nodes.is_empty() {
                return Ok(());
            }
            return Err(violation("non-empty tree without a root"));
        };

        let mut visited = 0;
        let range = self.validate_node(root, &mut visited)?;
        if range != (0, self.indices.len()) {
            return Err(violation(format!(
                "root covers {:?} instead of 0..{}",
                range,
                self.indices.len()
            )));
        }
        if visited != self.nodes.len() {
            return Err(violation(format!(
                "{} of {} nodes reachable from the root",
                visited,
                self.nodes.len()
            )));
        }
        Ok(())
    }

    fn validate_node(&self, id: u32, visited: &mut usize) -> Result<(usize, usize)> {
        *visited += 1;
        if *visited > self.nodes.len() {
            return Err(violation("node reachable more than once"));
        }
        let node = self
            .nodes
            .get(id as usize)
            .ok_or_else(|| violation(format!("child offset {} outside the arena", id)))?;

        let (start, end) = match node.kind {
            NodeKind::Leaf { start, end } => {
                let (start, end) = (start as usize, end as usize);
                if start >= end || end > self.indices.len() {
                    return Err(violation(format!("leaf {} has bad range {}..{}", id, start, end)));
                }
                if end - start > self.leaf_size {
                    return Err(violation(format!(
                        "leaf {} holds {} points, limit is {}",
                        id,
                        end - start,
                        self.leaf_size
                    )));
                }
                (start, end)
            }
            NodeKind::Internal {
                axis,
                split,
                left,
                right,
            } => {
                if axis >= D {
                    return Err(violation(format!("node {} splits on axis {}", id, axis)));
                }
                let (ls, le) = self.validate_node(left, visited)?;
                let (rs, re) = self.validate_node(right, visited)?;
                if le != rs {
                    return Err(violation(format!("children of node {} are not adjacent", id)));
                }
                let left_ok = self.indices[ls..le]
                    .iter()
                    .all(|&i| self.storage.coord(i, axis) <= split);
                let right_ok = self.indices[rs..re]
                    .iter()
                    .all(|&i| self.storage.coord(i, axis) >= split);
                if !left_ok || !right_ok {
                    return Err(violation(format!(
                        "split {} of node {} does not separate its children",
                        split, id
                    )));
                }
                (ls, re)
            }
        };

        for &idx in &self.indices[start..end] {
            if !node.bounds.contains(&self.storage.point(idx)) {
                return Err(violation(format!("point {} outside the box of node {}", idx, id)));
            }
        }
        Ok((start, end))
    }
}

/// Upper bound on the arena size for `count` points.
///
/// Every leaf below a split holds at least `ceil(leaf_size / 2)` points, so
/// there are at most `ceil(count / ceil(leaf_size / 2))` leaves and fewer than
/// twice as many nodes.
fn max_nodes(count: usize, leaf_size: usize) -> u64 {
    2 * (count as u64).div_ceil(leaf_size.div_ceil(2) as u64)
}

/// Leaf ranges and arena offsets are stored as `u32`.
fn check_capacity(count: usize, leaf_size: usize) -> Result<()> {
    if count as u64 > u32::MAX as u64 {
        return Err(Error::invalid(format!("{} points exceed the u32 leaf ranges", count)));
    }
    if max_nodes(count, leaf_size) > u32::MAX as u64 {
        return Err(Error::invalid(format!(
            "{} points with leaf size {} may exceed the u32 node offsets",
            count, leaf_size
        )));
    }
    Ok(())
}

fn violation(msg: impl Into<String>) -> Error {
    Error::InvariantViolation(msg.into())
}

impl<S, const D: usize> std::fmt::Debug for KdTree<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KdTree")
            .field("dim", &D)
            .field("points", &self.indices.len())
            .field("nodes", &self.nodes.len())
            .field("leaf_size", &self.leaf_size)
            .finish_non_exhaustive()
    }
}
