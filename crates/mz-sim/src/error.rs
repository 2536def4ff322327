use thiserror::Error;

/// Configuration errors raised before a run starts. The run itself never
/// errors: solver trouble is reported on the result, cancellation sets
/// `completed = false`.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-monotonic input: {what}")]
    NonMonotonic { what: &'static str },

    #[error("Inconsistent input: {what}")]
    Inconsistent { what: String },
}

pub type SimResult<T> = Result<T, SimError>;
