#![allow(non_snake_case, clippy::module_name_repetitions)]
//! Estimated sampling covariance of the fitted coefficients
use crate::coefficients::CoefficientVector;
use crate::error::{IntensityError, Result};
use crate::LogitFloat;
use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use ndarray_linalg::Inverse;
use serde::{Deserialize, Serialize};

/// Inverse regularization strength from which a fit is considered unregularized
pub const UNREGULARIZED_INVERSE_STRENGTH: LogitFloat = 1e10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Penalty {
    L1,
    L2,
}

/// How the coefficients were fitted, which decides how their covariance is obtained.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub enum FittingMethod {
    /// Plain maximum likelihood
    Unregularized,
    /// Ridge penalty with inverse strength `C` (penalty weight `1 / C`)
    L2Regularized { inverse_strength: LogitFloat },
    /// Lasso penalty. Its covariance is not supported.
    L1Regularized { inverse_strength: LogitFloat },
    /// The fitting library already reports a normalized covariance (e.g. IRLS).
    NativeCovariance(Array2<LogitFloat>),
}

impl FittingMethod {
    /// Dispatch on a penalty and inverse strength pair the way penalized
    /// logistic fitters report them. Very weak penalties count as none.
    pub fn from_penalty(penalty: Penalty, inverse_strength: LogitFloat) -> Self {
        if inverse_strength >= UNREGULARIZED_INVERSE_STRENGTH {
            return Self::Unregularized;
        }
        match penalty {
            Penalty::L2 => Self::L2Regularized { inverse_strength },
            Penalty::L1 => Self::L1Regularized { inverse_strength },
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Unregularized => "an unregularized fit",
            Self::L2Regularized { .. } => "an L2 regularized fit",
            Self::L1Regularized { .. } => "an L1 regularized fit",
            Self::NativeCovariance(_) => "a native covariance",
        }
    }
}

/// Square symmetric covariance of `beta_hat`, intercept row/column included.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawCovariance")]
pub struct CovarianceMatrix {
    matrix: Array2<LogitFloat>,
}

#[derive(Deserialize)]
struct RawCovariance {
    matrix: Array2<LogitFloat>,
}

impl TryFrom<RawCovariance> for CovarianceMatrix {
    type Error = IntensityError;

    fn try_from(raw: RawCovariance) -> Result<Self> {
        Self::new(raw.matrix)
    }
}

impl CovarianceMatrix {
    /// # Errors
    /// `Dimension` when `matrix` is not square.
    pub fn new(matrix: Array2<LogitFloat>) -> Result<Self> {
        IntensityError::check_dim("covariance columns", matrix.nrows(), matrix.ncols())?;
        Ok(Self { matrix })
    }

    /// Isotropic covariance `scale * I`
    pub fn scaled_identity(dim: usize, scale: LogitFloat) -> Self {
        Self {
            matrix: Array2::<LogitFloat>::eye(dim) * scale,
        }
    }

    pub fn view(&self) -> ArrayView2<LogitFloat> {
        self.matrix.view()
    }

    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// `x^T Sigma x`
    ///
    /// # Errors
    /// `Dimension` when `x` does not match the covariance.
    pub fn quadratic_form(&self, x: ArrayView1<LogitFloat>) -> Result<LogitFloat> {
        IntensityError::check_dim("aligned vector", self.dim(), x.len())?;
        Ok(x.dot(&self.matrix.dot(&x)))
    }

    pub fn into_inner(self) -> Array2<LogitFloat> {
        self.matrix
    }
}

/// Estimates the covariance of one coefficient vector
#[derive(Clone, Copy, Debug)]
pub struct CovarianceEstimator<'a> {
    coefficients: &'a CoefficientVector,
}

impl<'a> CovarianceEstimator<'a> {
    pub fn new(coefficients: &'a CoefficientVector) -> Self {
        Self { coefficients }
    }

    /// `design` holds one training example per row, in the caller's
    /// coordinates. It is ignored for [`FittingMethod::NativeCovariance`].
    ///
    /// # Errors
    /// * `UnsupportedModel` for L1 penalties or a non-positive inverse strength
    /// * `MissingDesign` when a derivation needs the design matrix
    /// * `Dimension` for shape mismatches
    /// * `Linalg` when the information matrix cannot be inverted
    pub fn estimate(
        &self,
        design: Option<ArrayView2<LogitFloat>>,
        method: &FittingMethod,
    ) -> Result<CovarianceMatrix> {
        let dim = self.coefficients.full_dim();
        match method {
            FittingMethod::NativeCovariance(matrix) => {
                let cov = CovarianceMatrix::new(matrix.clone())?;
                IntensityError::check_dim("native covariance", dim, cov.dim())?;
                Ok(cov)
            }
            FittingMethod::L1Regularized { .. } => Err(IntensityError::UnsupportedModel(
                "L1 regularized logit covariance is not supported".to_string(),
            )),
            FittingMethod::Unregularized => {
                let design = design.ok_or(IntensityError::MissingDesign(method.name()))?;
                let info = self.information_matrix(design)?;
                Ok(CovarianceMatrix {
                    matrix: info.inv()?,
                })
            }
            FittingMethod::L2Regularized { inverse_strength } => {
                if !(*inverse_strength > 0. && inverse_strength.is_finite()) {
                    return Err(IntensityError::UnsupportedModel(format!(
                        "L2 inverse regularization strength must be positive and finite, got {}",
                        inverse_strength
                    )));
                }
                let design = design.ok_or(IntensityError::MissingDesign(method.name()))?;
                let info = self.information_matrix(design)?;
                let lambda_c = 1. / inverse_strength;
                let penalty = Array2::<LogitFloat>::eye(dim) * (2. * lambda_c);
                let inv_omega_lambda = (&info + &penalty).inv()?;
                debug!("L2 sandwich covariance with penalty weight {}", lambda_c);
                Ok(CovarianceMatrix {
                    matrix: inv_omega_lambda.dot(&info).dot(&inv_omega_lambda),
                })
            }
        }
    }

    /// Fisher information `X^T W X` with `W = diag(p_i (1 - p_i))`
    fn information_matrix(&self, design: ArrayView2<LogitFloat>) -> Result<Array2<LogitFloat>> {
        let X = self.aligned_design(design)?;
        let weights: Array1<LogitFloat> = X.dot(&self.coefficients.full()).mapv(|score| {
            let p = sigmoid(score);
            p * (1. - p)
        });
        trace!("IRLS weights {}", weights);
        let weighted = &X * &weights.insert_axis(Axis(1));
        Ok(X.t().dot(&weighted))
    }

    fn aligned_design(&self, design: ArrayView2<LogitFloat>) -> Result<Array2<LogitFloat>> {
        if design.nrows() == 0 {
            return Err(IntensityError::Dimension {
                what: "design rows",
                expected: 1,
                found: 0,
            });
        }
        let dim = self.coefficients.full_dim();
        let mut X = Array2::<LogitFloat>::zeros((design.nrows(), dim));
        for (row, mut out) in design.rows().into_iter().zip(X.rows_mut()) {
            out.assign(&self.coefficients.align(row)?);
        }
        Ok(X)
    }
}

/// Logistic function, split on the sign of `z` to avoid overflow
pub fn sigmoid(z: LogitFloat) -> LogitFloat {
    if z >= 0. {
        1. / (1. + (-z).exp())
    } else {
        let e = z.exp();
        e / (1. + e)
    }
}
