use thiserror::Error;

/// Control-system construction errors.
#[derive(Error, Debug, Clone)]
pub enum ControlError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid reference: {what}")]
    InvalidReference { what: String },

    #[error("Control topology error: {what}")]
    Topology { what: String },
}

pub type ControlResult<T> = Result<T, ControlError>;
