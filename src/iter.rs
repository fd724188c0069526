//! Pull-based query iterators.
//!
//! [`RangeIter`] and [`KnnIter`] are explicit state machines over a borrowed
//! tree. Nothing is traversed when a query is issued: the first call to
//! [`has_next`](RangeIter::has_next), [`advance`](RangeIter::advance) or
//! [`Iterator::next`] starts the traversal. The iterator then keeps one result
//! of lookahead, so it moves to the exhausted state as soon as its last result
//! has been handed out.
//!
//! Both iterators are single pass. Once exhausted they stay exhausted: `next`
//! keeps returning `None` and `advance` keeps failing with
//! [`Error::ExhaustedIterator`]. To enumerate the results again, issue the
//! query again.
//!
//! Cloning forks an iterator at its current position: the clone yields the
//! results the original has not handed out yet, and both advance
//! independently. Cloning a fresh iterator is the same as issuing the query a
//! second time.
//!
//! Two iterators compare equal when they run the same query on the same tree
//! and sit at the same position. Every exhausted iterator of a query equals
//! the query's [`end`](RangeIter::end) sentinel, and so does a fresh iterator
//! whose query has no results, so `while it != end { it.advance()?; }` is a
//! complete loop. Deciding that for a fresh range query looks ahead on a copy
//! of the iterator, up to the first match; the iterator itself stays
//! untouched.

use crate::error::{Error, Result};
use crate::kdtree::{KdTree, NodeKind};
use crate::points::PointStorage;
use crate::query::{dist_sq, knn_search, near_far, Candidate, Pending};
use std::iter::FusedIterator;
use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    NotStarted,
    Active,
    Exhausted,
}

/// Logical position used by the equality contract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Position {
    At(usize),
    End,
}

/// Iterator over the points within a radius of a query point.
///
/// Created by [`KdTree::range_query`] and [`KdTree::range_index_query`].
/// Results are unordered.
pub struct RangeIter<'t, S, const D: usize> {
    tree: &'t KdTree<S, D>,
    point: [f64; D],
    radius: f64,
    radius_sq: f64,
    exclude: Option<usize>,
    state: State,
    stack: Vec<Pending>,
    // Positions in the permutation of the current leaf not yet tested.
    cursor: Range<usize>,
    lookahead: Option<usize>,
    yielded: usize,
}

impl<'t, S: PointStorage<D>, const D: usize> RangeIter<'t, S, D> {
    pub(crate) fn new(tree: &'t KdTree<S, D>, point: [f64; D], radius: f64, exclude: Option<usize>) -> Self {
        Self {
            tree,
            point,
            radius,
            radius_sq: radius * radius,
            exclude,
            state: State::NotStarted,
            stack: Vec::new(),
            cursor: 0..0,
            lookahead: None,
            yielded: 0,
        }
    }

    /// Whether another result is available. Starts the traversal on the first
    /// call.
    pub fn has_next(&mut self) -> bool {
        self.fill();
        self.lookahead.is_some()
    }

    /// Next result, or [`Error::ExhaustedIterator`] once `has_next()` is false.
    pub fn advance(&mut self) -> Result<usize> {
        self.next().ok_or(Error::ExhaustedIterator)
    }

    fn fill(&mut self) {
        if self.lookahead.is_some() {
            return;
        }
        match self.state {
            State::Exhausted => return,
            State::NotStarted => {
                if let Some(root) = self.tree.root() {
                    self.push(root);
                }
                self.state = State::Active;
            }
            State::Active => {}
        }
        self.lookahead = self.search();
        if self.lookahead.is_none() {
            self.state = State::Exhausted;
            self.stack = Vec::new();
        }
    }

    fn push(&mut self, node: u32) {
        let d2 = self.tree.node(node).bounds().min_dist_sq(&self.point);
        if d2 <= self.radius_sq {
            self.stack.push(Pending { node, dist_sq: d2 });
        }
    }

    /// Resumes the depth-first traversal until the next match.
    fn search(&mut self) -> Option<usize> {
        let tree = self.tree;
        let storage = tree.storage();
        let indices = tree.indices();
        loop {
            for pos in self.cursor.by_ref() {
                let idx = indices[pos];
                if self.exclude == Some(idx) {
                    continue;
                }
                if dist_sq(&storage.point(idx), &self.point) <= self.radius_sq {
                    return Some(idx);
                }
            }

            let Pending { node, .. } = self.stack.pop()?;
            match tree.node(node).kind() {
                NodeKind::Leaf { start, end } => {
                    self.cursor = start as usize..end as usize;
                }
                NodeKind::Internal { axis, split, left, right } => {
                    let (near, far) = near_far(&self.point, axis, split, left, right);
                    self.push(far);
                    self.push(near);
                }
            }
        }
    }
}

impl<'t, S, const D: usize> RangeIter<'t, S, D> {
    /// The end-of-sequence sentinel of this query.
    pub fn end(&self) -> Self {
        Self {
            tree: self.tree,
            point: self.point,
            radius: self.radius,
            radius_sq: self.radius_sq,
            exclude: self.exclude,
            state: State::Exhausted,
            stack: Vec::new(),
            cursor: 0..0,
            lookahead: None,
            yielded: self.yielded,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn point(&self) -> &[f64; D] {
        &self.point
    }
}

impl<S: PointStorage<D>, const D: usize> RangeIter<'_, S, D> {
    fn position(&self) -> Position {
        match self.state {
            State::Exhausted => Position::End,
            State::Active => Position::At(self.yielded),
            State::NotStarted if !self.clone().has_next() => Position::End,
            State::NotStarted => Position::At(0),
        }
    }
}

impl<S: PointStorage<D>, const D: usize> Iterator for RangeIter<'_, S, D> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        self.fill();
        let idx = self.lookahead.take()?;
        self.yielded += 1;
        self.fill();
        Some(idx)
    }
}

impl<S: PointStorage<D>, const D: usize> FusedIterator for RangeIter<'_, S, D> {}

impl<S: PointStorage<D>, const D: usize> PartialEq for RangeIter<'_, S, D> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree)
            && self.point == other.point
            && self.radius == other.radius
            && self.exclude == other.exclude
            && self.position() == other.position()
    }
}

/// Forks the iterator at its current position.
impl<S, const D: usize> Clone for RangeIter<'_, S, D> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            point: self.point,
            radius: self.radius,
            radius_sq: self.radius_sq,
            exclude: self.exclude,
            state: self.state,
            stack: self.stack.clone(),
            cursor: self.cursor.clone(),
            lookahead: self.lookahead,
            yielded: self.yielded,
        }
    }
}

impl<S, const D: usize> std::fmt::Debug for RangeIter<'_, S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeIter")
            .field("point", &self.point)
            .field("radius", &self.radius)
            .field("state", &self.state)
            .field("yielded", &self.yielded)
            .finish_non_exhaustive()
    }
}

/// Iterator over the k nearest points of a query point, in ascending
/// distance. Equal distances come out in ascending point index.
///
/// Created by [`KdTree::knn_query`], [`KdTree::knn_index_query`] and
/// [`KdTree::nearest_query`]. The bounded search runs on the first request;
/// later steps only drain its candidates.
pub struct KnnIter<'t, S, const D: usize> {
    tree: &'t KdTree<S, D>,
    point: [f64; D],
    k: usize,
    exclude: Option<usize>,
    state: State,
    candidates: std::vec::IntoIter<Candidate>,
    lookahead: Option<usize>,
    yielded: usize,
}

impl<'t, S: PointStorage<D>, const D: usize> KnnIter<'t, S, D> {
    pub(crate) fn new(tree: &'t KdTree<S, D>, point: [f64; D], k: usize, exclude: Option<usize>) -> Self {
        Self {
            tree,
            point,
            k,
            exclude,
            state: State::NotStarted,
            candidates: Vec::new().into_iter(),
            lookahead: None,
            yielded: 0,
        }
    }

    /// Whether another result is available. Runs the search on the first call.
    pub fn has_next(&mut self) -> bool {
        self.fill();
        self.lookahead.is_some()
    }

    /// Next result, or [`Error::ExhaustedIterator`] once `has_next()` is false.
    pub fn advance(&mut self) -> Result<usize> {
        self.next().ok_or(Error::ExhaustedIterator)
    }

    fn fill(&mut self) {
        if self.lookahead.is_some() {
            return;
        }
        match self.state {
            State::Exhausted => return,
            State::NotStarted => {
                self.candidates = knn_search(self.tree, &self.point, self.k, self.exclude).into_iter();
                self.state = State::Active;
            }
            State::Active => {}
        }
        self.lookahead = self.candidates.next().map(|c| c.index);
        if self.lookahead.is_none() {
            self.state = State::Exhausted;
        }
    }
}

impl<'t, S, const D: usize> KnnIter<'t, S, D> {
    /// The end-of-sequence sentinel of this query.
    pub fn end(&self) -> Self {
        Self {
            tree: self.tree,
            point: self.point,
            k: self.k,
            exclude: self.exclude,
            state: State::Exhausted,
            candidates: Vec::new().into_iter(),
            lookahead: None,
            yielded: self.yielded,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn point(&self) -> &[f64; D] {
        &self.point
    }

    /// With `k >= 1` the query comes back empty exactly when no indexed point
    /// other than the excluded one exists.
    fn finds_nothing(&self) -> bool {
        match self.tree.len() {
            0 => true,
            1 => self.exclude == Some(self.tree.indices()[0]),
            _ => false,
        }
    }

    fn position(&self) -> Position {
        match self.state {
            State::Exhausted => Position::End,
            State::Active => Position::At(self.yielded),
            State::NotStarted if self.finds_nothing() => Position::End,
            State::NotStarted => Position::At(0),
        }
    }
}

impl<S: PointStorage<D>, const D: usize> Iterator for KnnIter<'_, S, D> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        self.fill();
        let idx = self.lookahead.take()?;
        self.yielded += 1;
        self.fill();
        Some(idx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.state {
            State::NotStarted => (0, Some(self.k.min(self.tree.len()))),
            _ => {
                let n = self.candidates.len() + usize::from(self.lookahead.is_some());
                (n, Some(n))
            }
        }
    }
}

impl<S: PointStorage<D>, const D: usize> FusedIterator for KnnIter<'_, S, D> {}

impl<S: PointStorage<D>, const D: usize> PartialEq for KnnIter<'_, S, D> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree)
            && self.point == other.point
            && self.k == other.k
            && self.exclude == other.exclude
            && self.position() == other.position()
    }
}

/// Forks the iterator at its current position.
impl<S, const D: usize> Clone for KnnIter<'_, S, D> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            point: self.point,
            k: self.k,
            exclude: self.exclude,
            state: self.state,
            candidates: self.candidates.clone(),
            lookahead: self.lookahead,
            yielded: self.yielded,
        }
    }
}

impl<S, const D: usize> std::fmt::Debug for KnnIter<'_, S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnnIter")
            .field("point", &self.point)
            .field("k", &self.k)
            .field("state", &self.state)
            .field("yielded", &self.yielded)
            .finish_non_exhaustive()
    }
}
