//! Error types for element construction.

use thiserror::Error;

/// Errors raised when an element is built with invalid parameters.
///
/// Solve-time behaviour never errors: flow relations clamp and guard instead
/// (see the crate docs), so the only fallible surface is construction.
#[derive(Error, Debug, Clone)]
pub enum ElementError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },
}

pub type ElementResult<T> = Result<T, ElementError>;
