use thiserror::Error;

use crate::NodeId;

pub type Result<T> = std::result::Result<T, RingError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    #[error("Key already exists in the ring: {0}")]
    DuplicateKey(String),

    #[error("Key not found in the ring: {0}")]
    KeyNotFound(String),

    #[error("Node already exists in the ring: {0}")]
    NodeAlreadyExists(NodeId),

    #[error("Node not found in the ring: {0}")]
    NodeNotFound(NodeId),

    #[error("No node has spare capacity and node auto-creation is disabled")]
    NoCapacityAvailable,

    #[error("Invalid ring configuration: {0}")]
    InvalidConfig(String),

    #[error("Ring worker is no longer running")]
    WorkerUnavailable,
}

impl RingError {
    pub(crate) fn duplicate_key<K: std::fmt::Debug>(key: &K) -> Self {
        RingError::DuplicateKey(format!("{:?}", key))
    }

    pub(crate) fn key_not_found<K: std::fmt::Debug>(key: &K) -> Self {
        RingError::KeyNotFound(format!("{:?}", key))
    }
}
