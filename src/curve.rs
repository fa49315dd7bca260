//! Intensity as a function of the misclassification level, the data behind
//! intensity-vs-level plots
use crate::engine::PerturbationResult;
use crate::error::Result;
use crate::LogitFloat;
use serde::{Deserialize, Serialize};

/// Evenly spaced levels over `[start, end]`, both included.
pub fn level_grid(start: LogitFloat, end: LogitFloat, num: usize) -> Vec<LogitFloat> {
    match num {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (num - 1) as LogitFloat;
            (0..num).map(|i| start + step * i as LogitFloat).collect()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct IntensityCurve {
    pub label: Option<String>,
    /// `(alpha, lambda_star)` pairs in level order of the results
    pub points: Vec<(LogitFloat, LogitFloat)>,
}

impl IntensityCurve {
    /// Levels without an intensity are left out.
    pub fn from_results(label: Option<String>, results: &[PerturbationResult]) -> Self {
        Self {
            label,
            points: results
                .iter()
                .filter_map(|r| r.lambda_star.map(|lambda| (r.alpha, lambda)))
                .collect(),
        }
    }

    pub fn alphas(&self) -> Vec<LogitFloat> {
        self.points.iter().map(|p| p.0).collect()
    }

    pub fn lambdas(&self) -> Vec<LogitFloat> {
        self.points.iter().map(|p| p.1).collect()
    }

    /// Whether the intensity never decreases as the level grows past 0.5
    pub fn is_monotone_above_half(&self, tol: LogitFloat) -> bool {
        let mut above: Vec<_> = self.points.iter().filter(|p| p.0 > 0.5).collect();
        above.sort_by(|a, b| a.0.total_cmp(&b.0));
        above.windows(2).all(|w| w[1].1 + tol >= w[0].1)
    }

    /// # Errors
    /// `Config` if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
