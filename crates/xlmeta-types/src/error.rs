use thiserror::Error;

/// Errors produced by schema operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("part count mismatch: {numbers} part numbers, {sizes} part sizes")]
    PartsMismatch { numbers: usize, sizes: usize },

    #[error("shard distribution has {actual} entries, expected {expected} (data + parity)")]
    DistributionMismatch { expected: usize, actual: usize },
}
