use thiserror::Error;

/// Internal failures of the linear-solve layer.
///
/// These never escape [`crate::AirflowSolver::solve`]; a failed factorisation
/// aborts the Newton loop and the result reports non-convergence instead.
#[derive(Error, Debug, Clone)]
pub enum AirflowError {
    #[error("Singular matrix during {what}")]
    Singular { what: &'static str },

    #[error("Iterative solve failed: {what}")]
    IterativeBreakdown { what: &'static str },
}

pub type AirflowResult<T> = Result<T, AirflowError>;
