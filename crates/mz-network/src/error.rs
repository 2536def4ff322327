use thiserror::Error;

/// Errors raised while assembling a network.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Duplicate id: {what}")]
    DuplicateId { what: String },

    #[error("Invalid topology: {what}")]
    Topology { what: String },

    #[error("Invalid node state: {what}")]
    NodeState { what: String },
}

pub type NetworkResult<T> = Result<T, NetworkError>;
