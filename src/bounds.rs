use crate::points::PointStorage;

/// Generic bounding box for N-dimensional space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox<const D: usize> {
    pub min: [f64; D],
    pub max: [f64; D],
}

impl<const D: usize> BoundingBox<D> {
    pub fn new(min: [f64; D], max: [f64; D]) -> Self {
        Self { min, max }
    }

    /// An inverted box that any point will grow.
    pub fn empty() -> Self {
        Self {
            min: [f64::INFINITY; D],
            max: [f64::NEG_INFINITY; D],
        }
    }

    /// Bounding box of the points referenced by `indices`.
    ///
    /// Returns [`BoundingBox::empty`] when `indices` is empty.
    pub fn from_indices<S>(storage: &S, indices: &[usize]) -> Self
    where
        S: PointStorage<D> + ?Sized,
    {
        let mut bounds = Self::empty();
        for &idx in indices {
            bounds.grow(&storage.point(idx));
        }
        bounds
    }

    /// Extends the box so it contains `p`.
    pub fn grow(&mut self, p: &[f64; D]) {
        for i in 0..D {
            if p[i] < self.min[i] { self.min[i] = p[i]; }
            if p[i] > self.max[i] { self.max[i] = p[i]; }
        }
    }

    pub fn is_empty(&self) -> bool {
        (0..D).any(|i| self.max[i] < self.min[i])
    }

    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    /// Axis with the largest extent. Ties go to the lower axis.
    pub fn longest_axis(&self) -> usize {
        let mut axis = 0;
        for i in 1..D {
            if self.extent(i) > self.extent(axis) {
                axis = i;
            }
        }
        axis
    }

    pub fn contains(&self, p: &[f64; D]) -> bool {
        (0..D).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Squared distance from `p` to the closest point of the box, zero inside.
    ///
    /// This is a lower bound on the squared distance from `p` to anything the
    /// box contains.
    #[inline]
    pub fn min_dist_sq(&self, p: &[f64; D]) -> f64 {
        let mut d2 = 0.0;
        for i in 0..D {
            let v = p[i];
            if v < self.min[i] { d2 += (self.min[i] - v).powi(2); }
            else if v > self.max[i] { d2 += (v - self.max[i]).powi(2); }
        }
        d2
    }
}
