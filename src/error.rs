use thiserror::Error;

/// Result type alias for tree construction and queries.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by tree construction and queries.
///
/// Every parameter is checked by the call that receives it, so a query that
/// returned an iterator never fails later during traversal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A malformed parameter: negative radius, `k < 1`, `leaf_size < 1`,
    /// mismatched dimensionality or an index outside the point storage.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An iterator was advanced after it reported no further results.
    #[error("Iterator advanced past the end of its results")]
    ExhaustedIterator,

    /// A built tree failed a structural check in [`KdTree::validate`](crate::KdTree::validate).
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}
