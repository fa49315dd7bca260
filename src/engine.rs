#![allow(clippy::module_name_repetitions)]
//! Public entry point: adversarial examples at chosen misclassification levels
use crate::bounds::FeatureBounds;
use crate::coefficients::{CoefficientVector, Label};
use crate::config::EngineConfig;
use crate::covariance::{CovarianceEstimator, CovarianceMatrix, FittingMethod};
use crate::error::{IntensityError, Result};
use crate::probability::probability_predicted_equals;
use crate::projection::orthogonal_projection;
use crate::solver::{check_level, solve_lambda};
use crate::LogitFloat;
use log::{debug, warn};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Adversarial example for one misclassification level. Vectors are in the
/// caller's coordinates.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct PerturbationResult {
    pub alpha: LogitFloat,
    /// `None` when the level has no real solution, or when the example was
    /// discarded by the bounds (unless configured otherwise)
    pub lambda_star: Option<LogitFloat>,
    pub x_adv_star: Option<Array1<LogitFloat>>,
    /// Orthogonal projection, i.e. the adversarial example at level 0.5
    pub x_adv_zero: Option<Array1<LogitFloat>>,
}

/// Requested misclassification levels
#[derive(Clone, Debug, PartialEq)]
pub enum Levels {
    Single(LogitFloat),
    Many(Vec<LogitFloat>),
}

impl From<LogitFloat> for Levels {
    fn from(alpha: LogitFloat) -> Self {
        Self::Single(alpha)
    }
}

impl From<Vec<LogitFloat>> for Levels {
    fn from(alphas: Vec<LogitFloat>) -> Self {
        Self::Many(alphas)
    }
}

impl From<&[LogitFloat]> for Levels {
    fn from(alphas: &[LogitFloat]) -> Self {
        Self::Many(alphas.to_vec())
    }
}

/// One result per requested level, in request order
#[derive(Clone, Debug, PartialEq)]
pub enum Perturbation {
    Single(PerturbationResult),
    Batch(Vec<PerturbationResult>),
}

impl Perturbation {
    pub fn into_vec(self) -> Vec<PerturbationResult> {
        match self {
            Self::Single(result) => vec![result],
            Self::Batch(results) => results,
        }
    }
}

/// Collects the pieces of a [`PerturbationEngine`]. The covariance must be
/// set, or estimated, before [`build`](Self::build).
#[derive(Clone, Debug)]
pub struct EngineBuilder {
    coefficients: CoefficientVector,
    covariance: Option<CovarianceMatrix>,
    bounds: FeatureBounds,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn new(coefficients: CoefficientVector) -> Self {
        Self {
            coefficients,
            covariance: None,
            bounds: FeatureBounds::default(),
            config: EngineConfig::default(),
        }
    }

    pub fn covariance(mut self, covariance: CovarianceMatrix) -> Self {
        self.covariance = Some(covariance);
        self
    }

    /// # Errors
    /// See [`CovarianceEstimator::estimate`].
    pub fn estimate_covariance(
        mut self,
        design: Option<ArrayView2<LogitFloat>>,
        method: &FittingMethod,
    ) -> Result<Self> {
        let covariance = CovarianceEstimator::new(&self.coefficients).estimate(design, method)?;
        self.covariance = Some(covariance);
        Ok(self)
    }

    pub fn bounds(mut self, bounds: FeatureBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// # Errors
    /// * `MissingCovariance` when no covariance was given
    /// * `Dimension` when the covariance or per-feature bounds do not match
    ///   the coefficients
    pub fn build(self) -> Result<PerturbationEngine> {
        let covariance = self.covariance.ok_or(IntensityError::MissingCovariance)?;
        IntensityError::check_dim(
            "covariance",
            self.coefficients.full_dim(),
            covariance.dim(),
        )?;
        if let FeatureBounds::PerFeature(bounds) = &self.bounds {
            IntensityError::check_dim(
                "feature bounds",
                self.coefficients.without_intercept().len(),
                bounds.ndim(),
            )?;
        }
        Ok(PerturbationEngine {
            coefficients: self.coefficients,
            covariance,
            bounds: self.bounds,
            config: self.config,
        })
    }
}

/// Computes minimal-intensity adversarial examples for a fitted logistic
/// regression. Immutable once built.
#[derive(Clone, Debug)]
pub struct PerturbationEngine {
    coefficients: CoefficientVector,
    covariance: CovarianceMatrix,
    bounds: FeatureBounds,
    config: EngineConfig,
}

impl PerturbationEngine {
    pub fn coefficients(&self) -> &CoefficientVector {
        &self.coefficients
    }

    pub fn covariance(&self) -> &CovarianceMatrix {
        &self.covariance
    }

    pub fn bounds(&self) -> &FeatureBounds {
        &self.bounds
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Orthogonal projection of `x` onto the decision hyperplane, with the
    /// configured overshoot, in the caller's coordinates.
    ///
    /// # Errors
    /// `Dimension` or `DegenerateModel`.
    pub fn orthogonal_projection(&self, x: ArrayView1<LogitFloat>) -> Result<Array1<LogitFloat>> {
        let x_full = self.coefficients.align(x)?;
        let delta = orthogonal_projection(
            &self.coefficients,
            x_full.view(),
            self.config.tolerances.overshoot,
        )?;
        Ok(self.coefficients.convention().to_caller(delta.view()))
    }

    /// # Errors
    /// `Dimension` when `x` does not match the coefficients.
    pub fn probability_predicted_equals(
        &self,
        x: ArrayView1<LogitFloat>,
        y: Label,
    ) -> Result<LogitFloat> {
        let x_full = self.coefficients.align(x)?;
        probability_predicted_equals(x_full.view(), y, &self.coefficients, &self.covariance)
    }

    /// Adversarial examples of `x`, whose true class is `y`, at each
    /// requested level.
    ///
    /// # Errors
    /// Any error of the projection, the solver or the bounds; a failed
    /// internal check is reported as `InvariantViolation`. A level without a
    /// real solution is not an error, its result carries `None`.
    pub fn compute_perturbation(
        &self,
        x: ArrayView1<LogitFloat>,
        y: Label,
        levels: impl Into<Levels>,
    ) -> Result<Perturbation> {
        match levels.into() {
            Levels::Single(alpha) => self.perturb_single(x, y, alpha).map(Perturbation::Single),
            Levels::Many(alphas) => self.perturb_levels(x, y, &alphas).map(Perturbation::Batch),
        }
    }

    /// # Errors
    /// See [`compute_perturbation`](Self::compute_perturbation).
    pub fn perturb_single(
        &self,
        x: ArrayView1<LogitFloat>,
        y: Label,
        alpha: LogitFloat,
    ) -> Result<PerturbationResult> {
        let mut results = self.perturb_levels(x, y, &[alpha])?;
        results
            .pop()
            .ok_or_else(|| IntensityError::InvariantViolation("no result".to_string()))
    }

    /// # Errors
    /// See [`compute_perturbation`](Self::compute_perturbation).
    pub fn perturb_batch(
        &self,
        x: ArrayView1<LogitFloat>,
        y: Label,
        alphas: &[LogitFloat],
    ) -> Result<Vec<PerturbationResult>> {
        self.perturb_levels(x, y, alphas)
    }

    fn perturb_levels(
        &self,
        x: ArrayView1<LogitFloat>,
        y: Label,
        alphas: &[LogitFloat],
    ) -> Result<Vec<PerturbationResult>> {
        alphas.iter().try_for_each(|&alpha| check_level(alpha))?;
        let x_full = self.coefficients.align(x)?;
        let tolerances = &self.config.tolerances;

        let correctly_predicted = self.coefficients.predicted_label(x_full.view())? == y;
        let delta = orthogonal_projection(&self.coefficients, x_full.view(), tolerances.overshoot)?;
        let x_adv_zero = &x_full + &delta;
        // the overshoot must carry the projection across the boundary
        let pred_zero = self.coefficients.predicted_label(x_adv_zero.view())?;
        if correctly_predicted == (pred_zero == y) {
            return Err(IntensityError::InvariantViolation(format!(
                "projection of a {} predicted example lands on class {}",
                if correctly_predicted {
                    "correctly"
                } else {
                    "incorrectly"
                },
                pred_zero
            )));
        }
        let x_adv_zero = self.enforce_bounds(x_adv_zero)?;

        let p_equals = probability_predicted_equals(
            x_full.view(),
            y,
            &self.coefficients,
            &self.covariance,
        )?;
        debug!(
            "correctly predicted: {}, P[pred(x) = y] = {}",
            correctly_predicted, p_equals
        );

        alphas
            .iter()
            .map(|&alpha| {
                self.perturb_level(
                    alpha,
                    x_full.view(),
                    y,
                    delta.view(),
                    p_equals,
                    x_adv_zero.clone(),
                )
            })
            .collect()
    }

    fn perturb_level(
        &self,
        alpha: LogitFloat,
        x_full: ArrayView1<LogitFloat>,
        y: Label,
        delta: ArrayView1<LogitFloat>,
        p_equals: LogitFloat,
        x_adv_zero: Option<Array1<LogitFloat>>,
    ) -> Result<PerturbationResult> {
        let (lambda_star, x_adv_full) = if 1. - p_equals >= alpha {
            // already misclassified with probability alpha
            (Some(0.), Some(x_full.to_owned()))
        } else {
            match solve_lambda(
                alpha,
                x_full,
                y,
                delta,
                &self.coefficients,
                &self.covariance,
                &self.config.tolerances,
            )? {
                Some(lambda) => {
                    let x_adv = &x_full + &(&delta * lambda);
                    self.check_adversarial(alpha, y, x_adv.view())?;
                    (Some(lambda), Some(x_adv))
                }
                None => {
                    warn!("No real solution for misclassification level {}", alpha);
                    (None, None)
                }
            }
        };

        let x_adv_star = match x_adv_full {
            Some(x_adv) => self.enforce_bounds(x_adv)?,
            None => None,
        };
        let lambda_star = if x_adv_star.is_none() && !self.config.keep_lambda_on_discard {
            None
        } else {
            lambda_star
        };
        Ok(PerturbationResult {
            alpha,
            lambda_star,
            x_adv_star,
            x_adv_zero,
        })
    }

    /// Checks that `x_adv` is on the expected side of the boundary and is
    /// misclassified with probability at least `alpha`.
    fn check_adversarial(
        &self,
        alpha: LogitFloat,
        y: Label,
        x_adv: ArrayView1<LogitFloat>,
    ) -> Result<()> {
        let tol = self.config.tolerances.tol;
        let pred = self.coefficients.predicted_label(x_adv)?;
        if alpha > 0.5 + tol && pred == y {
            return Err(IntensityError::InvariantViolation(format!(
                "adversarial example at level {} is still predicted {}",
                alpha, pred
            )));
        }
        if alpha < 0.5 - tol && pred != y {
            return Err(IntensityError::InvariantViolation(format!(
                "adversarial example at level {} flipped to {}",
                alpha, pred
            )));
        }
        let p_equals = probability_predicted_equals(x_adv, y, &self.coefficients, &self.covariance)?;
        if 1. - p_equals + tol < alpha {
            return Err(IntensityError::InvariantViolation(format!(
                "adversarial example reaches level {} instead of {}",
                1. - p_equals,
                alpha
            )));
        }
        Ok(())
    }

    /// Bounds apply to the features only, never to the constant. The result
    /// is in the caller's coordinates.
    fn enforce_bounds(&self, x_full: Array1<LogitFloat>) -> Result<Option<Array1<LogitFloat>>> {
        let convention = self.coefficients.convention();
        let constant = convention.intercept_index().map(|idx| x_full[idx]);
        let features = convention.features(x_full.view());
        Ok(self
            .bounds
            .enforce(features, self.config.bounds_mode)?
            .map(|features| match constant {
                Some(value) => {
                    let full = convention.with_intercept_value(features.view(), value);
                    convention.to_caller(full.view())
                }
                None => features,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::BoundsMode;
    use crate::coefficients::InterceptConvention;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn paper_engine(config: EngineConfig, bounds: FeatureBounds) -> PerturbationEngine {
        EngineBuilder::new(CoefficientVector::with_separate_intercept(0., array![2., -1.]))
            .covariance(CovarianceMatrix::scaled_identity(3, 0.01))
            .bounds(bounds)
            .config(config)
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_requires_covariance() {
        let builder =
            EngineBuilder::new(CoefficientVector::with_separate_intercept(0., array![2., -1.]));
        assert!(matches!(
            builder.clone().build(),
            Err(IntensityError::MissingCovariance)
        ));
        assert!(matches!(
            builder
                .covariance(CovarianceMatrix::scaled_identity(2, 1.))
                .build(),
            Err(IntensityError::Dimension { .. })
        ));
    }

    #[test]
    fn test_build_checks_bounds_dimension() {
        let bounds =
            FeatureBounds::per_feature(array![0., 0., 0.].view(), array![1., 1., 1.].view())
                .unwrap();
        assert!(matches!(
            EngineBuilder::new(CoefficientVector::with_separate_intercept(0., array![2., -1.]))
                .covariance(CovarianceMatrix::scaled_identity(3, 0.01))
                .bounds(bounds)
                .build(),
            Err(IntensityError::Dimension { .. })
        ));
    }

    #[test]
    fn test_zero_intensity_returns_input() {
        let engine = paper_engine(EngineConfig::default(), FeatureBounds::default());
        let x = array![1., 1.];
        // with y = 0 the example is already misclassified with probability ~1
        let result = engine.perturb_single(x.view(), Label::Zero, 0.6).unwrap();
        assert_eq!(result.lambda_star, Some(0.));
        assert_eq!(result.x_adv_star, Some(x));
    }

    #[test]
    fn test_single_and_batch_shapes() {
        let engine = paper_engine(EngineConfig::default(), FeatureBounds::default());
        let x = array![1., 1.];
        match engine.compute_perturbation(x.view(), Label::One, 0.9).unwrap() {
            Perturbation::Single(result) => assert_eq!(result.alpha, 0.9),
            Perturbation::Batch(_) => panic!("expected a single result"),
        }
        let alphas = vec![0.9, 0.6, 0.99];
        let results = engine
            .compute_perturbation(x.view(), Label::One, alphas.clone())
            .unwrap()
            .into_vec();
        assert_eq!(
            results.iter().map(|r| r.alpha).collect::<Vec<_>>(),
            alphas
        );
        assert!(results.iter().all(|r| r.lambda_star.unwrap() > 1.));
    }

    #[test]
    fn test_invalid_level_rejected_before_work() {
        let engine = paper_engine(EngineConfig::default(), FeatureBounds::default());
        assert!(matches!(
            engine.perturb_batch(array![1., 1.].view(), Label::One, &[0.9, 1.]),
            Err(IntensityError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_projection_in_caller_coordinates() {
        let engine = paper_engine(EngineConfig::default(), FeatureBounds::default());
        let delta = engine.orthogonal_projection(array![1., 1.].view()).unwrap();
        assert_eq!(delta.len(), 2);
        assert_abs_diff_eq!(delta[0], -0.4 * (1. + 1e-6), epsilon = 1e-12);
        assert_abs_diff_eq!(delta[1], 0.2 * (1. + 1e-6), epsilon = 1e-12);
    }

    #[test]
    fn test_discard_drops_lambda_unless_configured() {
        let bounds = FeatureBounds::uniform(0., 1.25);
        let x = array![1., 1.];

        let engine = paper_engine(
            EngineConfig::default().with_bounds_mode(BoundsMode::Discard),
            bounds.clone(),
        );
        // x_adv at 0.95 is about [0.49, 1.255], the projection [0.6, 1.2] is inside
        let result = engine.perturb_single(x.view(), Label::One, 0.95).unwrap();
        assert_eq!(result.x_adv_star, None);
        assert_eq!(result.lambda_star, None);
        assert!(result.x_adv_zero.is_some());

        let mut config = EngineConfig::default().with_bounds_mode(BoundsMode::Discard);
        config.keep_lambda_on_discard = true;
        let engine = paper_engine(config, bounds);
        let result = engine.perturb_single(x.view(), Label::One, 0.95).unwrap();
        assert_eq!(result.x_adv_star, None);
        assert!(result.lambda_star.unwrap() > 1.);
    }

    #[test]
    fn test_clip_never_touches_embedded_constant() {
        let coefs = CoefficientVector::new(
            array![0., 2., -1.],
            InterceptConvention::Embedded { index: 0 },
        )
        .unwrap();
        let engine = EngineBuilder::new(coefs)
            .covariance(CovarianceMatrix::scaled_identity(3, 0.01))
            .bounds(FeatureBounds::uniform(-0.5, 0.5))
            .config(EngineConfig::default().with_bounds_mode(BoundsMode::Clip))
            .build()
            .unwrap();
        let result = engine
            .perturb_single(array![1., 1., 1.].view(), Label::One, 0.95)
            .unwrap();
        let x_adv = result.x_adv_star.unwrap();
        assert_eq!(x_adv.len(), 3);
        assert_eq!(x_adv[0], 1.);
        assert!(x_adv.iter().skip(1).all(|v| (-0.5..=0.5).contains(v)));
    }

    #[test]
    fn test_example_on_boundary_is_invariant_violation() {
        let engine = paper_engine(EngineConfig::default(), FeatureBounds::default());
        // score exactly 0 is predicted 0, and projecting does not move it
        assert!(matches!(
            engine.perturb_single(array![1., 2.].view(), Label::One, 0.9),
            Err(IntensityError::InvariantViolation(_))
        ));
    }
}
