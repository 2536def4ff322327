use thiserror::Error;

pub type MzResult<T> = Result<T, MzError>;

#[derive(Error, Debug)]
pub enum MzError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-monotonic input: {what}")]
    NonMonotonic { what: &'static str },
}
