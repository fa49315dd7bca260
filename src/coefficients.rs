#![allow(clippy::module_name_repetitions)]
//! Fitted coefficients of a binary logistic regression and the bookkeeping
//! needed to line examples up with them.
use crate::error::{IntensityError, Result};
use crate::LogitFloat;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::iter;

/// True or predicted class of an example
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Label {
    Zero,
    One,
}

impl Label {
    /// The classifier predicts `One` iff the linear score is strictly positive.
    pub fn from_score(score: LogitFloat) -> Self {
        if score > 0. {
            Self::One
        } else {
            Self::Zero
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Zero,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }
}

impl TryFrom<u8> for Label {
    type Error = IntensityError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Zero),
            1 => Ok(Self::One),
            other => Err(IntensityError::InvalidLabel(other)),
        }
    }
}

impl From<bool> for Label {
    fn from(positive: bool) -> Self {
        if positive {
            Self::One
        } else {
            Self::Zero
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// How the intercept of the model relates to the examples handed to the engine.
///
/// * `NoIntercept`: the model has no intercept, examples and coefficients have
///   the same length.
/// * `Separate`: the model has an intercept stored at `index` of the full
///   coefficient vector, but examples do not carry the constant column. A `1`
///   is inserted at `index` before any product with the coefficients.
/// * `Embedded`: the examples already carry the constant at `index`, nothing
///   is inserted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum InterceptConvention {
    NoIntercept,
    Separate { index: usize },
    Embedded { index: usize },
}

impl Default for InterceptConvention {
    fn default() -> Self {
        Self::NoIntercept
    }
}

impl InterceptConvention {
    pub fn intercept_index(&self) -> Option<usize> {
        match *self {
            Self::NoIntercept => None,
            Self::Separate { index } | Self::Embedded { index } => Some(index),
        }
    }

    pub fn has_intercept(&self) -> bool {
        self.intercept_index().is_some()
    }

    /// Whether examples must be extended with a constant before use
    pub fn prepends_constant(&self) -> bool {
        matches!(self, Self::Separate { .. })
    }

    /// Length of an example in the caller's coordinates
    pub fn caller_dim(&self, full_dim: usize) -> usize {
        if self.prepends_constant() {
            full_dim - 1
        } else {
            full_dim
        }
    }

    /// Map an example in the caller's coordinates to the full coefficient space.
    ///
    /// # Errors
    /// `Dimension` when `x` does not have the caller length implied by `full_dim`.
    pub fn align(&self, x: ArrayView1<LogitFloat>, full_dim: usize) -> Result<Array1<LogitFloat>> {
        IntensityError::check_dim("example", self.caller_dim(full_dim), x.len())?;
        Ok(match *self {
            Self::Separate { index } => insert_at(x, index, 1.),
            Self::NoIntercept | Self::Embedded { .. } => x.to_owned(),
        })
    }

    /// Inverse of [`align`](Self::align)
    pub fn to_caller(&self, full: ArrayView1<LogitFloat>) -> Array1<LogitFloat> {
        match *self {
            Self::Separate { index } => remove_at(full, index),
            Self::NoIntercept | Self::Embedded { .. } => full.to_owned(),
        }
    }

    /// Drop the intercept coordinate of a full-space vector, if there is one.
    pub fn features(&self, full: ArrayView1<LogitFloat>) -> Array1<LogitFloat> {
        match self.intercept_index() {
            Some(index) => remove_at(full, index),
            None => full.to_owned(),
        }
    }

    /// Put `value` back at the intercept coordinate of a feature-space vector.
    pub fn with_intercept_value(
        &self,
        features: ArrayView1<LogitFloat>,
        value: LogitFloat,
    ) -> Array1<LogitFloat> {
        match self.intercept_index() {
            Some(index) => insert_at(features, index, value),
            None => features.to_owned(),
        }
    }
}

fn insert_at(x: ArrayView1<LogitFloat>, index: usize, value: LogitFloat) -> Array1<LogitFloat> {
    x.iter()
        .take(index)
        .copied()
        .chain(iter::once(value))
        .chain(x.iter().skip(index).copied())
        .collect()
}

fn remove_at(x: ArrayView1<LogitFloat>, index: usize) -> Array1<LogitFloat> {
    x.iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, v)| *v)
        .collect()
}

/// Estimated coefficient vector `beta_hat` of the logistic regression, intercept
/// included when the model has one.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawCoefficients")]
pub struct CoefficientVector {
    full: Array1<LogitFloat>,
    without_intercept: Array1<LogitFloat>,
    convention: InterceptConvention,
}

/// Serialized form of [`CoefficientVector`]. The intercept-free view is
/// rebuilt from `full` rather than trusted.
#[derive(Deserialize)]
struct RawCoefficients {
    full: Array1<LogitFloat>,
    convention: InterceptConvention,
}

impl TryFrom<RawCoefficients> for CoefficientVector {
    type Error = IntensityError;

    fn try_from(raw: RawCoefficients) -> Result<Self> {
        Self::new(raw.full, raw.convention)
    }
}

impl CoefficientVector {
    /// # Errors
    /// `Dimension` when the intercept index falls outside `full`.
    pub fn new(full: Array1<LogitFloat>, convention: InterceptConvention) -> Result<Self> {
        if let Some(index) = convention.intercept_index() {
            if index >= full.len() {
                return Err(IntensityError::Dimension {
                    what: "intercept index",
                    expected: full.len(),
                    found: index,
                });
            }
        }
        let without_intercept = convention.features(full.view());
        Ok(Self {
            full,
            without_intercept,
            convention,
        })
    }

    /// Coefficients of a model fitted without an intercept
    pub fn without_intercept_term(coefs: Array1<LogitFloat>) -> Self {
        Self {
            without_intercept: coefs.clone(),
            full: coefs,
            convention: InterceptConvention::NoIntercept,
        }
    }

    /// Coefficients of a model whose intercept is reported apart from the
    /// feature weights. The intercept lands at index 0 and examples are
    /// expected without a constant column.
    pub fn with_separate_intercept(intercept: LogitFloat, coefs: Array1<LogitFloat>) -> Self {
        Self {
            full: insert_at(coefs.view(), 0, intercept),
            without_intercept: coefs,
            convention: InterceptConvention::Separate { index: 0 },
        }
    }

    pub fn full(&self) -> ArrayView1<LogitFloat> {
        self.full.view()
    }

    pub fn without_intercept(&self) -> ArrayView1<LogitFloat> {
        self.without_intercept.view()
    }

    pub fn convention(&self) -> InterceptConvention {
        self.convention
    }

    pub fn has_intercept(&self) -> bool {
        self.convention.has_intercept()
    }

    pub fn full_dim(&self) -> usize {
        self.full.len()
    }

    /// Length of an example as handed in by the caller
    pub fn caller_dim(&self) -> usize {
        self.convention.caller_dim(self.full_dim())
    }

    /// # Errors
    /// See [`InterceptConvention::align`].
    pub fn align(&self, x: ArrayView1<LogitFloat>) -> Result<Array1<LogitFloat>> {
        self.convention.align(x, self.full_dim())
    }

    /// Linear score `x^T beta_hat` of an aligned example
    ///
    /// # Errors
    /// `Dimension` when `x_full` is not aligned.
    pub fn score(&self, x_full: ArrayView1<LogitFloat>) -> Result<LogitFloat> {
        IntensityError::check_dim("aligned example", self.full_dim(), x_full.len())?;
        Ok(x_full.dot(&self.full))
    }

    /// # Errors
    /// `Dimension` when `x_full` is not aligned.
    pub fn predicted_label(&self, x_full: ArrayView1<LogitFloat>) -> Result<Label> {
        self.score(x_full).map(Label::from_score)
    }
}

impl Display for CoefficientVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Coefficients {} ({:?})", self.full, self.convention)
    }
}
