//! Result data types.

use serde::{Deserialize, Serialize};

use crate::{ResultsError, ResultsResult};

pub type RunId = String;

/// Time series of requested symbol values, optionally with the ensemble
/// fluctuation of each symbol's final value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResults {
    pub model_name: String,
    pub simulator: String,
    pub symbol_names: Vec<String>,
    pub time_values: Vec<f64>,
    /// `symbol_values[point][symbol]`, in `symbol_names` order.
    pub symbol_values: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluctuations: Option<Vec<f64>>,
}

impl SimulationResults {
    pub fn new(
        model_name: impl Into<String>,
        simulator: impl Into<String>,
        symbol_names: Vec<String>,
        time_values: Vec<f64>,
        symbol_values: Vec<Vec<f64>>,
        fluctuations: Option<Vec<f64>>,
    ) -> ResultsResult<Self> {
        if symbol_values.len() != time_values.len() {
            return Err(ResultsError::InvalidShape {
                what: format!(
                    "{} rows of values for {} time points",
                    symbol_values.len(),
                    time_values.len()
                ),
            });
        }
        if let Some(row) = symbol_values.iter().find(|r| r.len() != symbol_names.len()) {
            return Err(ResultsError::InvalidShape {
                what: format!("row of {} values for {} symbols", row.len(), symbol_names.len()),
            });
        }
        if let Some(f) = &fluctuations
            && f.len() != symbol_names.len()
        {
            return Err(ResultsError::InvalidShape {
                what: format!("{} fluctuations for {} symbols", f.len(), symbol_names.len()),
            });
        }
        Ok(Self {
            model_name: model_name.into(),
            simulator: simulator.into(),
            symbol_names,
            time_values,
            symbol_values,
            fluctuations,
        })
    }

    pub fn num_points(&self) -> usize {
        self.time_values.len()
    }

    pub fn symbol_index(&self, name: &str) -> Option<usize> {
        self.symbol_names.iter().position(|s| s == name)
    }

    /// All sampled values of one symbol.
    pub fn series(&self, name: &str) -> Option<Vec<f64>> {
        let i = self.symbol_index(name)?;
        Some(self.symbol_values.iter().map(|row| row[i]).collect())
    }

    pub fn final_values(&self) -> Option<&[f64]> {
        self.symbol_values.last().map(Vec::as_slice)
    }

    pub fn fluctuation(&self, name: &str) -> Option<f64> {
        let i = self.symbol_index(name)?;
        self.fluctuations.as_ref().map(|f| f[i])
    }
}

/// Metadata stored next to a saved run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub model_name: String,
    pub simulator: String,
    pub timestamp: String,
    pub start_time: f64,
    pub end_time: f64,
    pub num_points: usize,
    pub ensemble_size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl RunManifest {
    /// Manifest for `results`, stamped with the current UTC time.
    pub fn for_results(
        run_id: impl Into<RunId>,
        results: &SimulationResults,
        ensemble_size: usize,
        seed: Option<u64>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            model_name: results.model_name.clone(),
            simulator: results.simulator.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            start_time: results.time_values.first().copied().unwrap_or(0.0),
            end_time: results.time_values.last().copied().unwrap_or(0.0),
            num_points: results.num_points(),
            ensemble_size,
            seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SimulationResults {
        SimulationResults::new(
            "m",
            "gibson-bruck",
            vec!["A".into(), "B".into()],
            vec![0.0, 1.0],
            vec![vec![10.0, 0.0], vec![7.0, 3.0]],
            Some(vec![0.5, 0.25]),
        )
        .unwrap()
    }

    #[test]
    fn lookup_by_name() {
        let r = sample();
        assert_eq!(r.series("B"), Some(vec![0.0, 3.0]));
        assert_eq!(r.final_values(), Some(&[7.0, 3.0][..]));
        assert_eq!(r.fluctuation("A"), Some(0.5));
        assert_eq!(r.series("C"), None);
    }

    #[test]
    fn shape_is_checked() {
        let err = SimulationResults::new(
            "m",
            "s",
            vec!["A".into()],
            vec![0.0, 1.0],
            vec![vec![1.0]],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ResultsError::InvalidShape { .. }));

        let err = SimulationResults::new("m", "s", vec!["A".into()], vec![0.0], vec![vec![1.0, 2.0]], None)
            .unwrap_err();
        assert!(matches!(err, ResultsError::InvalidShape { .. }));
    }

    #[test]
    fn manifest_spans_time_range() {
        let m = RunManifest::for_results("abc", &sample(), 4, Some(7));
        assert_eq!(m.start_time, 0.0);
        assert_eq!(m.end_time, 1.0);
        assert_eq!(m.num_points, 2);
        assert!(chrono::DateTime::parse_from_rfc3339(&m.timestamp).is_ok());
    }
}
