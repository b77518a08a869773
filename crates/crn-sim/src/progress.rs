//! Progress events and the per-run context that delivers them.

use std::sync::Arc;
use std::time::Duration;

use crate::controller::SimulationController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct SimulationProgress {
    pub fraction_complete: f64,
    pub iterations: u64,
    pub sim_time: f64,
    pub ensemble_member: usize,
    pub elapsed_wall_s: f64,
    pub stage: RunStage,
}

/// Default gap between controller polls and progress events.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(250);

/// Optional observers of one simulation run.
pub struct RunContext<'a> {
    controller: Option<Arc<SimulationController>>,
    progress: Option<&'a mut dyn FnMut(SimulationProgress)>,
    update_interval: Duration,
}

impl Default for RunContext<'_> {
    fn default() -> Self {
        Self {
            controller: None,
            progress: None,
            update_interval: DEFAULT_UPDATE_INTERVAL,
        }
    }
}

impl<'a> RunContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_controller(mut self, controller: Arc<SimulationController>) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn with_progress(mut self, callback: &'a mut dyn FnMut(SimulationProgress)) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    pub fn controller(&self) -> Option<&Arc<SimulationController>> {
        self.controller.as_ref()
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Polls the controller; true means the run must stop.
    pub(crate) fn poll_cancelled(&self) -> bool {
        self.controller
            .as_ref()
            .is_some_and(|c| c.handle_pause_or_cancel())
    }

    pub(crate) fn report(&mut self, event: SimulationProgress) {
        if let Some(cb) = self.progress.as_mut() {
            cb(event);
        }
    }
}

/// Overall completion of an ensemble run.
pub(crate) fn fraction_complete(
    member: usize,
    ensemble_size: usize,
    time: f64,
    start: f64,
    end: f64,
) -> f64 {
    let within = ((time - start) / (end - start)).clamp(0.0, 1.0);
    ((member as f64 + within) / ensemble_size as f64).clamp(0.0, 1.0)
}
