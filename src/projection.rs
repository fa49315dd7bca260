//! Orthogonal projection onto the decision hyperplane
use crate::coefficients::CoefficientVector;
use crate::error::{IntensityError, Result};
use crate::LogitFloat;
use ndarray::{Array1, ArrayView1};

pub const DEFAULT_OVERSHOOT: LogitFloat = 1e-6;

/// Minimal L2 perturbation `delta` such that `x_full + delta` lies on the
/// hyperplane `beta_hat^T point = 0`, scaled by `1 + overshoot` so that the
/// projected point ends up strictly on the other side.
///
/// The intercept coordinate of `delta` is always zero: shifting the constant
/// is not a perturbation of the example.
///
/// # Errors
/// * `DegenerateModel` when the non-intercept coefficients are all zero
/// * `Dimension` when `x_full` is not aligned with the coefficients
pub fn orthogonal_projection(
    coefficients: &CoefficientVector,
    x_full: ArrayView1<LogitFloat>,
    overshoot: LogitFloat,
) -> Result<Array1<LogitFloat>> {
    let score = coefficients.score(x_full)?;
    let beta = coefficients.without_intercept();
    let sq_norm = beta.dot(&beta);
    if sq_norm == 0. {
        return Err(IntensityError::DegenerateModel);
    }
    let delta = &beta * (-(score / sq_norm) * (1. + overshoot));
    Ok(coefficients
        .convention()
        .with_intercept_value(delta.view(), 0.))
}
