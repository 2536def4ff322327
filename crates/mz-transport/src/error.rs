use thiserror::Error;

/// Construction-time errors for transport inputs. Solve-time behaviour
/// clamps and logs instead of failing.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}

pub type TransportResult<T> = Result<T, TransportError>;
