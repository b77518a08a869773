//! The `Simulator` trait and the run request every simulator accepts.

use crn_model::Model;
use crn_results::SimulationResults;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::params::SimulatorParameters;
use crate::progress::RunContext;

/// Output window and the symbols to record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRequest {
    pub start_time: f64,
    pub end_time: f64,
    /// Number of output points, including both ends.
    pub num_points: usize,
    pub requested_symbols: Vec<String>,
}

impl SimulationRequest {
    pub fn new<S: Into<String>>(
        start_time: f64,
        end_time: f64,
        num_points: usize,
        requested_symbols: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            start_time,
            end_time,
            num_points,
            requested_symbols: requested_symbols.into_iter().map(Into::into).collect(),
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.num_points < 2 {
            return Err(SimError::invalid_arg(format!(
                "number of time points must be greater than 1, got {}",
                self.num_points
            )));
        }
        if !(self.start_time.is_finite() && self.end_time.is_finite()) {
            return Err(SimError::invalid_arg("start and end times must be finite"));
        }
        if self.end_time <= self.start_time {
            return Err(SimError::invalid_arg(format!(
                "end time {} must be greater than start time {}",
                self.end_time, self.start_time
            )));
        }
        if self.requested_symbols.is_empty() {
            return Err(SimError::invalid_arg("no symbols were requested"));
        }
        Ok(())
    }

    /// `start + i·Δt` for `i` in `0..num_points`, the last point clamped to
    /// `end_time`.
    pub fn time_points(&self) -> SimResult<Vec<f64>> {
        self.validate()?;
        let step = (self.end_time - self.start_time) / (self.num_points - 1) as f64;
        let mut times: Vec<f64> = (0..self.num_points)
            .map(|i| self.start_time + i as f64 * step)
            .collect();
        if let Some(last) = times.last_mut() {
            *last = self.end_time;
        }
        Ok(times)
    }
}

/// A simulation algorithm bound to one model at a time.
pub trait Simulator: Send {
    /// Registry alias of the algorithm.
    fn name(&self) -> &'static str;

    /// Binds `model`, replacing any previously bound model.
    fn initialize(&mut self, model: &Model) -> SimResult<()>;

    fn is_initialized(&self) -> bool;

    fn default_parameters(&self) -> SimulatorParameters;

    /// Runs the bound model. Fails with `IllegalState` before `initialize`.
    fn simulate(
        &mut self,
        request: &SimulationRequest,
        params: &SimulatorParameters,
        ctx: &mut RunContext<'_>,
    ) -> SimResult<SimulationResults>;
}

pub(crate) fn not_initialized(name: &str) -> SimError {
    SimError::illegal_state(format!("simulator \"{name}\" has not been initialized with a model"))
}
