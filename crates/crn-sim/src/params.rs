//! Simulator parameter bundle and its file formats.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Sizing of the deterministic delayed-reaction history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayedSolverConfig {
    /// Safety factor applied to the delay when sizing the history window.
    pub lambda_max: f64,
    /// Lower bound on the number of history samples.
    pub min_num_time_points: usize,
}

impl Default for DelayedSolverConfig {
    fn default() -> Self {
        Self {
            lambda_max: 1.1,
            min_num_time_points: 4000,
        }
    }
}

/// Algorithm parameters. Fields a simulator does not use are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorParameters {
    /// Number of trajectories averaged into the result.
    pub ensemble_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_allowed_relative_error: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_allowed_absolute_error: Option<f64>,
    /// Tau-leap: a leap must cover at least `1/step_size_fraction`
    /// expected single-reaction steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_size_fraction: Option<f64>,
    /// Deterministic: number of integration steps over the whole run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_num_steps: Option<usize>,
    /// Random seed; drawn from OS entropy when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Overrides the deterministic delayed-solver history length.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_history_bins: Option<usize>,
    pub delay: DelayedSolverConfig,
    pub compute_fluctuations: bool,
}

impl Default for SimulatorParameters {
    fn default() -> Self {
        Self {
            ensemble_size: 1,
            max_allowed_relative_error: None,
            max_allowed_absolute_error: None,
            step_size_fraction: None,
            min_num_steps: None,
            seed: None,
            num_history_bins: None,
            delay: DelayedSolverConfig::default(),
            compute_fluctuations: false,
        }
    }
}

impl SimulatorParameters {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_ensemble_size(mut self, ensemble_size: usize) -> Self {
        self.ensemble_size = ensemble_size;
        self
    }

    /// Checks value ranges of every field that is set.
    pub fn validate(&self) -> SimResult<()> {
        if self.ensemble_size == 0 {
            return Err(SimError::invalid_arg("ensemble size must be at least 1"));
        }
        if self.compute_fluctuations && self.ensemble_size < 2 {
            return Err(SimError::invalid_arg(
                "computing fluctuations requires an ensemble size of at least 2",
            ));
        }
        if let Some(e) = self.max_allowed_relative_error
            && !(e > 0.0 && e < 1.0)
        {
            return Err(SimError::invalid_arg(format!(
                "invalid max allowed relative error: {e}"
            )));
        }
        if let Some(e) = self.max_allowed_absolute_error
            && !(e > 0.0 && e.is_finite())
        {
            return Err(SimError::invalid_arg(format!(
                "invalid max allowed absolute error: {e}"
            )));
        }
        if let Some(f) = self.step_size_fraction
            && !(f > 0.0 && f.is_finite())
        {
            return Err(SimError::invalid_arg(format!("invalid step size fraction: {f}")));
        }
        if self.min_num_steps == Some(0) {
            return Err(SimError::invalid_arg("minimum number of steps must be positive"));
        }
        if self.num_history_bins == Some(0) {
            return Err(SimError::invalid_arg("number of history bins must be positive"));
        }
        if !(self.delay.lambda_max > 0.0 && self.delay.lambda_max.is_finite()) {
            return Err(SimError::invalid_arg(format!(
                "invalid delayed solver lambda_max: {}",
                self.delay.lambda_max
            )));
        }
        if self.delay.min_num_time_points == 0 {
            return Err(SimError::invalid_arg(
                "delayed solver needs at least one history time point",
            ));
        }
        Ok(())
    }

    pub fn from_yaml_str(text: &str) -> SimResult<Self> {
        let params: Self = serde_yaml::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_json_str(text: &str) -> SimResult<Self> {
        let params: Self = serde_json::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn load_yaml(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn load_json(path: &Path) -> SimResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn save_yaml(&self, path: &Path) -> SimResult<()> {
        self.validate()?;
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let p = SimulatorParameters::default();
        assert_eq!(p.ensemble_size, 1);
        assert_eq!(p.delay.min_num_time_points, 4000);
        p.validate().unwrap();
    }

    #[test]
    fn yaml_fills_missing_fields() {
        let p = SimulatorParameters::from_yaml_str(
            "ensemble_size: 8\nseed: 42\nmax_allowed_relative_error: 0.01\n",
        )
        .unwrap();
        assert_eq!(p.ensemble_size, 8);
        assert_eq!(p.seed, Some(42));
        assert_eq!(p.max_allowed_relative_error, Some(0.01));
        assert_eq!(p.delay, DelayedSolverConfig::default());
        assert!(!p.compute_fluctuations);
    }

    #[test]
    fn json_round_trip() {
        let p = SimulatorParameters {
            step_size_fraction: Some(0.2),
            num_history_bins: Some(500),
            ..SimulatorParameters::default()
        };
        let text = serde_json::to_string(&p).unwrap();
        assert_eq!(SimulatorParameters::from_json_str(&text).unwrap(), p);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad = [
            SimulatorParameters::default().with_ensemble_size(0),
            SimulatorParameters {
                max_allowed_relative_error: Some(1.0),
                ..Default::default()
            },
            SimulatorParameters {
                step_size_fraction: Some(0.0),
                ..Default::default()
            },
            SimulatorParameters {
                compute_fluctuations: true,
                ..Default::default()
            },
            SimulatorParameters {
                delay: DelayedSolverConfig {
                    lambda_max: 1.1,
                    min_num_time_points: 0,
                },
                ..Default::default()
            },
        ];
        for p in bad {
            assert!(matches!(p.validate(), Err(SimError::InvalidArg { .. })), "{p:?}");
        }
    }
}
