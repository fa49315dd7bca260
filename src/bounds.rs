#![allow(clippy::module_name_repetitions)]
//! Feasible range of the features and what to do when a perturbed example
//! leaves it
use crate::error::{IntensityError, Result};
use crate::LogitFloat;
use log::info;
use ndarray::iter::Lanes;
use ndarray::{stack, Array1, Array2, ArrayView1, Axis, Ix1, Zip};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Policy for perturbed examples outside the bounds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundsMode {
    /// Move offending coordinates onto the violated bound
    Clip,
    /// Drop the whole example
    Discard,
    /// Keep the example unchanged
    Ignore,
}

impl Default for BoundsMode {
    fn default() -> Self {
        Self::Ignore
    }
}

/// Per-feature lower and upper bounds stored as a `[2, n]` array
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawBounds1")]
pub struct Bounds1 {
    data: Array2<LogitFloat>,
}

#[derive(Deserialize)]
struct RawBounds1 {
    data: Array2<LogitFloat>,
}

impl TryFrom<RawBounds1> for Bounds1 {
    type Error = IntensityError;

    fn try_from(raw: RawBounds1) -> Result<Self> {
        IntensityError::check_dim("bound rows", 2, raw.data.nrows())?;
        Ok(Self { data: raw.data })
    }
}

impl Bounds1 {
    /// # Errors
    /// `Dimension` when `lower` and `upper` have different lengths.
    pub fn new<'a>(
        lower: ArrayView1<'a, LogitFloat>,
        upper: ArrayView1<'a, LogitFloat>,
    ) -> Result<Self> {
        IntensityError::check_dim("upper bounds", lower.len(), upper.len())?;
        let data = stack(Axis(0), &[lower, upper]).map_err(|_| IntensityError::Dimension {
            what: "upper bounds",
            expected: lower.len(),
            found: upper.len(),
        })?;
        Ok(Self { data })
    }

    pub fn lower(&self) -> ArrayView1<LogitFloat> {
        self.data.index_axis(Axis(0), 0)
    }

    pub fn upper(&self) -> ArrayView1<LogitFloat> {
        self.data.index_axis(Axis(0), 1)
    }

    pub fn ndim(&self) -> usize {
        self.data.ncols()
    }

    pub fn bounds_iter(&self) -> Lanes<LogitFloat, Ix1> {
        self.data.lanes(Axis(0))
    }

    pub fn is_member(&self, x: &ArrayView1<LogitFloat>) -> bool {
        Zip::from(x)
            .and(self.bounds_iter())
            .all(|&x, bounds| bounds[0] <= x && x <= bounds[1])
    }
}

impl Display for Bounds1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lower: {}\nUpper: {}", self.lower(), self.upper())
    }
}

/// Bounds shared by every feature or given feature by feature
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum FeatureBounds {
    Uniform { lower: LogitFloat, upper: LogitFloat },
    PerFeature(Bounds1),
}

impl Default for FeatureBounds {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl FeatureBounds {
    pub fn unbounded() -> Self {
        Self::Uniform {
            lower: LogitFloat::NEG_INFINITY,
            upper: LogitFloat::INFINITY,
        }
    }

    pub fn uniform(lower: LogitFloat, upper: LogitFloat) -> Self {
        Self::Uniform { lower, upper }
    }

    /// # Errors
    /// `Dimension` when `lower` and `upper` have different lengths.
    pub fn per_feature<'a>(
        lower: ArrayView1<'a, LogitFloat>,
        upper: ArrayView1<'a, LogitFloat>,
    ) -> Result<Self> {
        Bounds1::new(lower, upper).map(Self::PerFeature)
    }

    /// Bounds of feature `idx`
    fn limits(&self, idx: usize) -> (LogitFloat, LogitFloat) {
        match self {
            Self::Uniform { lower, upper } => (*lower, *upper),
            Self::PerFeature(bounds) => (bounds.lower()[idx], bounds.upper()[idx]),
        }
    }

    /// Whether every coordinate of `x` lies within its bounds
    pub fn contains(&self, x: ArrayView1<LogitFloat>) -> bool {
        match self {
            Self::Uniform { lower, upper } => x.iter().all(|v| lower <= v && v <= upper),
            Self::PerFeature(bounds) => bounds.ndim() == x.len() && bounds.is_member(&x),
        }
    }

    /// Apply `mode` to `x`, a vector in feature coordinates.
    ///
    /// Returns `None` only under [`BoundsMode::Discard`] when some coordinate
    /// falls outside the bounds.
    ///
    /// # Errors
    /// `Dimension` when per-feature bounds do not match `x`.
    pub fn enforce(
        &self,
        mut x: Array1<LogitFloat>,
        mode: BoundsMode,
    ) -> Result<Option<Array1<LogitFloat>>> {
        if let Self::PerFeature(bounds) = self {
            IntensityError::check_dim("bounded example", bounds.ndim(), x.len())?;
        }
        if self.contains(x.view()) {
            return Ok(Some(x));
        }
        let below = x
            .indexed_iter()
            .any(|(idx, &v)| v < self.limits(idx).0);
        if below {
            info!("Adversarial example x_adv < lower_bound.");
            match mode {
                BoundsMode::Discard => return Ok(None),
                BoundsMode::Clip => x.indexed_iter_mut().for_each(|(idx, v)| {
                    *v = v.max(self.limits(idx).0);
                }),
                BoundsMode::Ignore => {}
            }
        }
        let above = x
            .indexed_iter()
            .any(|(idx, &v)| v > self.limits(idx).1);
        if above {
            info!("Adversarial example x_adv > upper_bound.");
            match mode {
                BoundsMode::Discard => return Ok(None),
                BoundsMode::Clip => x.indexed_iter_mut().for_each(|(idx, v)| {
                    *v = v.min(self.limits(idx).1);
                }),
                BoundsMode::Ignore => {}
            }
        }
        Ok(Some(x))
    }
}
