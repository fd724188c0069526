use crate::bounds::BoundingBox;
use crate::error::{Error, Result};
use rand::Rng;

/// Read-only access to a fixed set of D-dimensional positions.
///
/// The tree never copies positions; it keeps indices into a `PointStorage`
/// and reads coordinates through [`PointStorage::point`] on demand. Implement
/// this for your own sample type to index it without conversion.
///
/// Coordinates are expected to be finite. NaN or infinite values are not
/// detected and make query results unspecified.
pub trait PointStorage<const D: usize> {
    /// Number of points in the storage.
    fn len(&self) -> usize;

    /// Position of the point at `index`, `index < self.len()`.
    fn point(&self, index: usize) -> [f64; D];

    /// Single coordinate of the point at `index`.
    #[inline]
    fn coord(&self, index: usize, axis: usize) -> f64 {
        self.point(index)[axis]
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const D: usize> PointStorage<D> for [[f64; D]] {
    fn len(&self) -> usize {
        <[[f64; D]]>::len(self)
    }

    #[inline]
    fn point(&self, index: usize) -> [f64; D] {
        self[index]
    }
}

impl<const D: usize> PointStorage<D> for Vec<[f64; D]> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn point(&self, index: usize) -> [f64; D] {
        self[index]
    }
}

impl<const D: usize, T: PointStorage<D> + ?Sized> PointStorage<D> for &T {
    fn len(&self) -> usize {
        (**self).len()
    }

    #[inline]
    fn point(&self, index: usize) -> [f64; D] {
        (**self).point(index)
    }

    #[inline]
    fn coord(&self, index: usize, axis: usize) -> f64 {
        (**self).coord(index, axis)
    }
}

/// Points stored as interleaved coordinates: `x0, y0, z0, x1, y1, z1, ...`.
#[derive(Clone, Copy, Debug)]
pub struct FlatPoints<'a, const D: usize> {
    coords: &'a [f64],
}

impl<'a, const D: usize> FlatPoints<'a, D> {
    /// Wraps `coords`, which must hold a whole number of D-dimensional points.
    pub fn new(coords: &'a [f64]) -> Result<Self> {
        if D == 0 {
            return Err(Error::invalid("points must have at least one dimension"));
        }
        if coords.len() % D != 0 {
            return Err(Error::invalid(format!(
                "{} coordinates do not form whole {}-dimensional points",
                coords.len(),
                D
            )));
        }
        Ok(Self { coords })
    }

    pub fn coords(&self) -> &'a [f64] {
        self.coords
    }
}

impl<const D: usize> PointStorage<D> for FlatPoints<'_, D> {
    fn len(&self) -> usize {
        self.coords.len() / D
    }

    #[inline]
    fn point(&self, index: usize) -> [f64; D] {
        let mut p = [0.0; D];
        p.copy_from_slice(&self.coords[index * D..(index + 1) * D]);
        p
    }

    #[inline]
    fn coord(&self, index: usize, axis: usize) -> f64 {
        self.coords[index * D + axis]
    }
}

/// Uniformly distributed points inside `bounds`, using the thread-local RNG.
///
/// Fails with [`Error::InvalidInput`] if `bounds` is inverted or not finite.
pub fn random_points<const D: usize>(count: usize, bounds: &BoundingBox<D>) -> Result<Vec<[f64; D]>> {
    random_points_with(&mut rand::thread_rng(), count, bounds)
}

/// Uniformly distributed points inside `bounds`, drawn from `rng`.
pub fn random_points_with<R: Rng + ?Sized, const D: usize>(
    rng: &mut R,
    count: usize,
    bounds: &BoundingBox<D>,
) -> Result<Vec<[f64; D]>> {
    for i in 0..D {
        let (lo, hi) = (bounds.min[i], bounds.max[i]);
        if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
            return Err(Error::invalid(format!(
                "cannot sample axis {} of box [{}, {}]",
                i, lo, hi
            )));
        }
    }
    Ok((0..count)
        .map(|_| {
            let mut p = [0.0; D];
            for (i, v) in p.iter_mut().enumerate() {
                *v = rng.gen_range(bounds.min[i]..=bounds.max[i]);
            }
            p
        })
        .collect())
}
