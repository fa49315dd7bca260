//! Engine configuration, (de)serializable from JSON
use crate::bounds::BoundsMode;
use crate::error::Result;
use crate::solver::Tolerances;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tolerances: Tolerances,
    /// What happens to adversarial examples outside the feature bounds
    pub bounds_mode: BoundsMode,
    /// Report the intensity even when its example was discarded by the bounds
    pub keep_lambda_on_discard: bool,
}

impl EngineConfig {
    /// Missing fields take their default value.
    ///
    /// # Errors
    /// `Config` on malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    /// `Config` if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_bounds_mode(mut self, bounds_mode: BoundsMode) -> Self {
        self.bounds_mode = bounds_mode;
        self
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }
}
