#![allow(non_snake_case)]
//! Closed-form intensity achieving a target misclassification level
use crate::coefficients::{CoefficientVector, Label};
use crate::covariance::CovarianceMatrix;
use crate::error::{IntensityError, Result};
use crate::projection::DEFAULT_OVERSHOOT;
use crate::LogitFloat;
use log::debug;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erf_inv;
use std::f64::consts::SQRT_2;

/// Numerical tolerances of the intensity computation
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Tolerances {
    /// Accepted residual of the level equation, also the discriminant slack
    pub tol: LogitFloat,
    /// Smallest leading coefficient the quadratic may be divided by
    pub tol_underflow: LogitFloat,
    /// Relative overshoot of the orthogonal projection
    pub overshoot: LogitFloat,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            tol: 1e-6,
            tol_underflow: 1e-7,
            overshoot: DEFAULT_OVERSHOOT,
        }
    }
}

/// # Errors
/// `InvalidLevel` unless `0 < alpha < 1`.
pub fn check_level(alpha: LogitFloat) -> Result<()> {
    if alpha > 0. && alpha < 1. {
        Ok(())
    } else {
        Err(IntensityError::InvalidLevel(alpha))
    }
}

/// `alpha` for `y = 1`, `1 - alpha` for `y = 0`. This is the only place the
/// two labels differ.
pub fn label_adjusted_level(alpha: LogitFloat, y: Label) -> LogitFloat {
    match y {
        Label::One => alpha,
        Label::Zero => 1. - alpha,
    }
}

/// Gaussian quantile factor `sqrt(2) erfinv(2 alpha' - 1)`
fn quantile_factor(alpha_adj: LogitFloat) -> LogitFloat {
    SQRT_2 * erf_inv(2. * alpha_adj - 1.)
}

/// Residual of the unsquared level equation
/// `x_adv^T beta_hat + sqrt(2) erfinv(2 alpha' - 1) sqrt(x_adv^T Sigma x_adv)`.
///
/// # Errors
/// `Dimension` when `x_adv` is not aligned.
pub fn level_residual(
    alpha_adj: LogitFloat,
    x_adv: ArrayView1<LogitFloat>,
    coefficients: &CoefficientVector,
    covariance: &CovarianceMatrix,
) -> Result<LogitFloat> {
    let score = coefficients.score(x_adv)?;
    let variance = covariance.quadratic_form(x_adv)?.max(0.);
    Ok(score + quantile_factor(alpha_adj) * variance.sqrt())
}

/// Coefficients `(a, b, c)` of the squared level equation in `lambda`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelQuadratic {
    pub a: LogitFloat,
    pub b: LogitFloat,
    pub c: LogitFloat,
}

impl LevelQuadratic {
    /// # Errors
    /// `Dimension` when the vectors and matrices disagree.
    pub fn new(
        alpha_adj: LogitFloat,
        x_full: ArrayView1<LogitFloat>,
        delta: ArrayView1<LogitFloat>,
        coefficients: &CoefficientVector,
        covariance: &CovarianceMatrix,
    ) -> Result<Self> {
        let dim = coefficients.full_dim();
        IntensityError::check_dim("aligned example", dim, x_full.len())?;
        IntensityError::check_dim("perturbation direction", dim, delta.len())?;
        IntensityError::check_dim("covariance", dim, covariance.dim())?;

        let beta = coefficients.full();
        let outer: Array2<LogitFloat> =
            &beta.insert_axis(Axis(1)) * &beta.insert_axis(Axis(0));
        let erfinv_sq = erf_inv(2. * alpha_adj - 1.).powi(2);
        let A = outer - &(&covariance.view() * (2. * erfinv_sq));

        let A_delta = A.dot(&delta);
        let A_x = A.dot(&x_full);
        Ok(Self {
            a: delta.dot(&A_delta),
            b: x_full.dot(&A_delta) + delta.dot(&A_x),
            c: x_full.dot(&A_x),
        })
    }

    pub fn discriminant(&self) -> LogitFloat {
        self.b * self.b - 4. * self.a * self.c
    }
}

/// Solve for the intensity `lambda` such that `x_full + lambda * delta` is
/// misclassified with estimated probability `alpha`.
///
/// Returns `Ok(None)` when the quadratic has no real root, i.e. the level is
/// not reachable along `delta`.
///
/// # Errors
/// * `InvalidLevel` unless `0 < alpha < 1`
/// * `UnderflowRisk` when the leading coefficient is below `tol_underflow`
/// * `RootSelection` when neither real root solves the unsquared equation
/// * `Dimension` for shape mismatches
pub fn solve_lambda(
    alpha: LogitFloat,
    x_full: ArrayView1<LogitFloat>,
    y: Label,
    delta: ArrayView1<LogitFloat>,
    coefficients: &CoefficientVector,
    covariance: &CovarianceMatrix,
    tolerances: &Tolerances,
) -> Result<Option<LogitFloat>> {
    check_level(alpha)?;
    let alpha_adj = label_adjusted_level(alpha, y);
    let quad = LevelQuadratic::new(alpha_adj, x_full, delta, coefficients, covariance)?;
    let LevelQuadratic { a, b, .. } = quad;
    debug!("level {} quadratic: a = {}, b = {}, c = {}", alpha, a, b, quad.c);
    if a < tolerances.tol_underflow {
        return Err(IntensityError::UnderflowRisk {
            a,
            tol_underflow: tolerances.tol_underflow,
        });
    }

    let disc = quad.discriminant();
    debug!("discriminant {}", disc);
    // slightly negative discriminants are rounding noise around a double root
    if disc.abs() < tolerances.tol && disc <= 0. {
        return Ok(Some(-b / (2. * a)));
    }
    if disc < 0. {
        debug!("no real solution for level {}", alpha);
        return Ok(None);
    }

    let sqrt_disc = disc.sqrt();
    let lambda1 = (-b - sqrt_disc) / (2. * a);
    let lambda2 = (-b + sqrt_disc) / (2. * a);
    debug!("two candidate intensities: {}, {}", lambda1, lambda2);
    for lambda in [lambda1, lambda2] {
        let x_adv = &x_full + &(&delta * lambda);
        let residual = level_residual(alpha_adj, x_adv.view(), coefficients, covariance)?;
        debug!("residual at {}: {}", lambda, residual);
        if residual.abs() < tolerances.tol {
            return Ok(Some(lambda));
        }
    }
    Err(IntensityError::RootSelection {
        lambda1,
        lambda2,
        tol: tolerances.tol,
    })
}
