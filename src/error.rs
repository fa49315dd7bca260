//! Error taxonomy for the perturbation-intensity engine
use ndarray_linalg::error::LinalgError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IntensityError>;

#[derive(Error, Debug)]
pub enum IntensityError {
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    Dimension {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Missing covariance of the coefficients. Provide one or estimate it before building the engine.")]
    MissingCovariance,

    #[error("Covariance estimation for {0} requires the training design matrix")]
    MissingDesign(&'static str),

    #[error("Degenerate model: the non-intercept coefficients have zero norm")]
    DegenerateModel,

    #[error("Risk of underflow: leading quadratic coefficient a = {a:e} is below {tol_underflow:e}")]
    UnderflowRisk { a: f64, tol_underflow: f64 },

    #[error("Neither root ({lambda1}, {lambda2}) satisfies the level equation within {tol:e}")]
    RootSelection {
        lambda1: f64,
        lambda2: f64,
        tol: f64,
    },

    #[error("Internal invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Misclassification level must lie strictly inside (0, 1), got {0}")]
    InvalidLevel(f64),

    #[error("Label must be 0 or 1, got {0}")]
    InvalidLabel(u8),

    #[error("A linear system solve failed. X^T W X may be singular. Error: {0}")]
    Linalg(#[from] LinalgError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl IntensityError {
    pub(crate) fn check_dim(what: &'static str, expected: usize, found: usize) -> Result<()> {
        if expected == found {
            Ok(())
        } else {
            Err(Self::Dimension {
                what,
                expected,
                found,
            })
        }
    }
}
