#![allow(clippy::must_use_candidate)]
//! Intensity of adversarial perturbations for logistic regression.
//!
//! Given the fitted coefficients of a binary logistic regression and their
//! estimated covariance, the engine scales the orthogonal projection of an
//! example onto the decision hyperplane so that the perturbed example is
//! misclassified with a chosen probability `alpha`, where the probability
//! accounts for the estimation uncertainty of the coefficients.
//!
//! ```no_run
//! use logit_intensity::{CoefficientVector, CovarianceMatrix, EngineBuilder, Label};
//! use ndarray::array;
//!
//! let engine = EngineBuilder::new(CoefficientVector::with_separate_intercept(0., array![2., -1.]))
//!     .covariance(CovarianceMatrix::scaled_identity(3, 0.01))
//!     .build()?;
//! let result = engine.perturb_single(array![1., 1.].view(), Label::One, 0.95)?;
//! println!("lambda* = {:?}", result.lambda_star);
//! # Ok::<(), logit_intensity::IntensityError>(())
//! ```
extern crate ndarray;
extern crate ndarray_linalg;
extern crate statrs;

pub mod bounds;
pub mod coefficients;
pub mod config;
pub mod covariance;
pub mod curve;
pub mod engine;
pub mod error;
pub mod probability;
pub mod projection;
pub mod solver;
mod test_util;

pub type LogitFloat = f64;

pub use crate::bounds::{BoundsMode, FeatureBounds};
pub use crate::coefficients::{CoefficientVector, InterceptConvention, Label};
pub use crate::config::EngineConfig;
pub use crate::covariance::{CovarianceEstimator, CovarianceMatrix, FittingMethod, Penalty};
pub use crate::curve::IntensityCurve;
pub use crate::engine::{
    EngineBuilder, Levels, Perturbation, PerturbationEngine, PerturbationResult,
};
pub use crate::error::{IntensityError, Result};
pub use crate::solver::Tolerances;
