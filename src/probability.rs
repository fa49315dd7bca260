//! Probability of a prediction when `beta_hat` is treated as a Gaussian vector
use crate::coefficients::{CoefficientVector, Label};
use crate::covariance::CovarianceMatrix;
use crate::error::{IntensityError, Result};
use crate::LogitFloat;
use log::trace;
use ndarray::ArrayView1;
use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;

/// Gaussian approximation of the linear score `s = x^T beta_hat`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreDistribution {
    pub mean: LogitFloat,
    pub variance: LogitFloat,
}

impl ScoreDistribution {
    /// # Errors
    /// `Dimension` when `x_full`, the coefficients and the covariance disagree.
    pub fn new(
        x_full: ArrayView1<LogitFloat>,
        coefficients: &CoefficientVector,
        covariance: &CovarianceMatrix,
    ) -> Result<Self> {
        IntensityError::check_dim("covariance", coefficients.full_dim(), covariance.dim())?;
        let mean = coefficients.score(x_full)?;
        let variance = covariance.quadratic_form(x_full)?;
        Ok(Self { mean, variance })
    }

    /// `P[s <= 0]`, the Gaussian cdf at zero. A degenerate (zero variance)
    /// score puts all its mass on the mean.
    pub fn prob_non_positive(&self) -> LogitFloat {
        if self.variance > 0. {
            0.5 * erfc(self.mean / (self.variance.sqrt() * SQRT_2))
        } else if self.mean > 0. {
            0.
        } else {
            1.
        }
    }

    pub fn prob_predicts(&self, label: Label) -> LogitFloat {
        let p_zero = self.prob_non_positive();
        match label {
            Label::Zero => p_zero,
            Label::One => 1. - p_zero,
        }
    }
}

/// Estimated probability that the classifier predicts `y` on the aligned
/// example `x_full`, accounting for the uncertainty of `beta_hat`.
///
/// # Errors
/// `Dimension` when `x_full`, the coefficients and the covariance disagree.
pub fn probability_predicted_equals(
    x_full: ArrayView1<LogitFloat>,
    y: Label,
    coefficients: &CoefficientVector,
    covariance: &CovarianceMatrix,
) -> Result<LogitFloat> {
    let dist = ScoreDistribution::new(x_full, coefficients, covariance)?;
    let p = dist.prob_predicts(y);
    trace!(
        "score mean {} variance {}: P[pred = {}] = {}",
        dist.mean,
        dist.variance,
        y,
        p
    );
    Ok(p)
}
