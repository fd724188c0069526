use crate::error::{Error, Result};

/// Leaf size used when none is given.
pub const DEFAULT_LEAF_SIZE: usize = 16;

/// Construction parameters for a [`KdTree`](crate::KdTree).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KdTreeConfig {
    /// Maximum number of points stored in a leaf. Must be at least 1.
    pub leaf_size: usize,
}

impl Default for KdTreeConfig {
    fn default() -> Self {
        Self { leaf_size: DEFAULT_LEAF_SIZE }
    }
}

impl KdTreeConfig {
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.leaf_size < 1 {
            return Err(Error::invalid("leaf size must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_validation() {
        let cfg = KdTreeConfig::default();
        assert_eq!(cfg.leaf_size, DEFAULT_LEAF_SIZE);
        assert!(cfg.validate().is_ok());
        assert!(cfg.with_leaf_size(1).validate().is_ok());
        assert_eq!(
            cfg.with_leaf_size(0).validate(),
            Err(Error::InvalidInput("leaf size must be at least 1".to_string()))
        );
    }
}
