use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DedupError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Partition violated: {assigned} of {expected} articles assigned to groups")]
    PartitionViolation { assigned: usize, expected: usize },

    #[error("Inconsistent group anchored at {0}")]
    InconsistentGroup(String),
}

pub type Result<T> = std::result::Result<T, DedupError>;
