use crate::bounds::BoundingBox;
use crate::kdtree::KdTree;
use crate::points::{random_points, FlatPoints, PointStorage};
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen_rayon::init_thread_pool;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn init_threads(n: usize) -> js_sys::Promise {
    init_thread_pool(n)
}

/// A 3D k-d tree for JavaScript. Owns a copy of the coordinates it was
/// built from, since JS memory cannot be borrowed across calls.
#[wasm_bindgen(js_name = KdTree3D)]
pub struct KdTree3D {
    inner: KdTree<Vec<[f64; 3]>, 3>,
}

#[wasm_bindgen(js_class = KdTree3D)]
impl KdTree3D {
    /// Builds the tree over interleaved `x, y, z` coordinates.
    #[wasm_bindgen(constructor)]
    pub fn new(coords: &[f64], leaf_size: usize) -> Result<KdTree3D, JsError> {
        let flat = FlatPoints::<3>::new(coords)?;
        let points: Vec<[f64; 3]> = (0..flat.len()).map(|i| flat.point(i)).collect();
        Ok(KdTree3D {
            inner: KdTree::build(points, leaf_size)?,
        })
    }

    #[wasm_bindgen(getter)]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[wasm_bindgen(getter, js_name = isEmpty)]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[wasm_bindgen(getter)]
    pub fn depth(&self) -> usize {
        self.inner.stats().depth
    }

    /// Indices of the points within `radius` of `(x, y, z)`, unordered.
    pub fn range(&self, x: f64, y: f64, z: f64, radius: f64) -> Result<Vec<u32>, JsError> {
        Ok(self.inner.range_query(&[x, y, z], radius)?.map(|i| i as u32).collect())
    }

    /// Indices of the `k` points nearest to `(x, y, z)`, nearest first.
    pub fn knn(&self, x: f64, y: f64, z: f64, k: usize) -> Result<Vec<u32>, JsError> {
        Ok(self.inner.knn_query(&[x, y, z], k)?.map(|i| i as u32).collect())
    }

    /// The `k` nearest neighbors of the stored point `index`, excluding itself.
    #[wasm_bindgen(js_name = knnOf)]
    pub fn knn_of(&self, index: usize, k: usize) -> Result<Vec<u32>, JsError> {
        Ok(self.inner.knn_index_query(index, k)?.map(|i| i as u32).collect())
    }

    pub fn nearest(&self, x: f64, y: f64, z: f64) -> Option<u32> {
        self.inner.nearest(&[x, y, z]).map(|i| i as u32)
    }
}

/// Uniform random points in a box, as interleaved `x, y, z` coordinates.
#[wasm_bindgen(js_name = randomPoints3D)]
pub fn random_points3d(
    count: usize,
    min_x: f64,
    min_y: f64,
    min_z: f64,
    max_x: f64,
    max_y: f64,
    max_z: f64,
) -> Result<Vec<f64>, JsError> {
    let bounds = BoundingBox::new([min_x, min_y, min_z], [max_x, max_y, max_z]);
    Ok(random_points(count, &bounds)?.into_iter().flatten().collect())
}
