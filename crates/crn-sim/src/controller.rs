//! Pause / resume / cancel control shared between a running simulation
//! and the thread that owns it.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct ControlState {
    stopped: bool,
    cancelled: bool,
}

/// Cooperative control object polled by the simulation loop.
#[derive(Debug, Default)]
pub struct SimulationController {
    state: Mutex<ControlState>,
    wake: Condvar,
}

impl SimulationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests cancellation and wakes a paused simulation.
    pub fn cancel(&self) {
        self.lock().cancelled = true;
        self.wake.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Pauses the simulation at its next poll.
    pub fn stop(&self) {
        self.set_stopped(true);
    }

    pub fn resume(&self) {
        self.set_stopped(false);
    }

    pub fn set_stopped(&self, stopped: bool) {
        self.lock().stopped = stopped;
        if !stopped {
            self.wake.notify_all();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Blocks while paused. Returns true if the simulation should abort.
    pub fn handle_pause_or_cancel(&self) -> bool {
        let mut state = self.lock();
        while state.stopped && !state.cancelled {
            state = self
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.cancelled
    }
}
