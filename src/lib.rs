//! # kdneighbors
//!
//! `kdneighbors` is a Rust library for neighborhood queries over a static point set,
//! designed to be used in Rust as well as compiled to WebAssembly (WASM). It feeds
//! local-neighborhood algorithms (surface or curvature fitting, say) with candidate
//! samples around a query position.
//!
//! ## Features
//!
//! - **Balanced k-d tree**: median splits along the axis of greatest extent, stored
//!   as a flat node arena plus a permutation of point indices. Points are never copied.
//! - **Range and k-NN queries**: bounding-box pruning, nearer child first, exact
//!   results; k-NN ties are broken by point index.
//! - **Lazy iterators**: queries return pull-based iterators that traverse only as far
//!   as the consumer reads.
//! - **Any dimension**: the dimension is a const generic over `f64` coordinates.
//! - **Parallel batches**: `par_knn` / `par_range` spread independent queries over rayon.
//!
//! ## Example
//!
//! ```rust
//! use kdneighbors::KdTree;
//!
//! let points = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0]];
//! let tree = KdTree::build(&points, 16).unwrap();
//!
//! let mut near: Vec<usize> = tree.range_query(&[0.0, 0.0], 1.5).unwrap().collect();
//! near.sort();
//! assert_eq!(near, vec![0, 1, 2]);
//!
//! let knn: Vec<usize> = tree.knn_query(&[0.0, 0.0], 2).unwrap().collect();
//! assert_eq!(knn, vec![0, 1]);
//! ```
//!
//! ## Main Interface
//!
//! The primary entry point is the [`KdTree`] struct, built over any [`PointStorage`].

mod bounds;
mod config;
mod error;
mod iter;
mod kdtree;
mod points;
mod query;
mod timing;
pub mod wasm;

pub use bounds::BoundingBox;
pub use config::KdTreeConfig;
pub use config::DEFAULT_LEAF_SIZE;
pub use error::Error;
pub use error::Result;
pub use iter::KnnIter;
pub use iter::RangeIter;
pub use kdtree::KdNode;
pub use kdtree::KdTree;
pub use kdtree::NodeKind;
pub use kdtree::TreeStats;
pub use points::random_points;
pub use points::random_points_with;
pub use points::FlatPoints;
pub use points::PointStorage;
