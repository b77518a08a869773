//! Delayed-reaction solver.
//!
//! A delayed reaction `R -> P` is split into `R -> I` (fires at the
//! original rate) and `I -> P` (the delayed reaction). The solver decides
//! when the second half fires. Stochastic runs keep a FIFO of completion
//! times, one per molecule that entered `I`. Deterministic runs keep a
//! history of `R` and `I` and estimate the outflow rate from the reactant
//! level one delay ago.

use std::collections::VecDeque;

use crate::binding::SymbolSlot;
use crate::error::{SimError, SimResult};
use crate::params::DelayedSolverConfig;
use crate::window::SlidingWindow;

#[derive(Debug, Clone)]
enum SolverMode {
    Stochastic {
        completions: VecDeque<f64>,
    },
    Deterministic {
        reactant_history: SlidingWindow,
        intermediate_history: SlidingWindow,
        first_point: bool,
    },
}

#[derive(Debug, Clone)]
pub struct DelayedReactionSolver {
    name: String,
    reactant: SymbolSlot,
    intermediate: usize,
    reaction: usize,
    delay: f64,
    rate: f64,
    resolution: f64,
    mode: SolverMode,
}

impl DelayedReactionSolver {
    /// `intermediate` is a dynamic-species index; `reaction` is the index
    /// of the `I -> P` reaction this solver drives.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        reactant: SymbolSlot,
        intermediate: usize,
        reaction: usize,
        delay: f64,
        rate: f64,
        stochastic: bool,
        config: &DelayedSolverConfig,
        history_bins: Option<usize>,
    ) -> SimResult<Self> {
        let name = name.into();
        if !(delay > 0.0 && delay.is_finite()) {
            return Err(SimError::invalid_input(format!(
                "delayed reaction \"{name}\" needs a positive delay, got {delay}"
            )));
        }
        if !(rate > 0.0 && rate.is_finite()) {
            return Err(SimError::invalid_input(format!(
                "delayed reaction \"{name}\" needs a positive rate, got {rate}"
            )));
        }

        let num_points = history_bins.unwrap_or_else(|| {
            let scaled = (delay * config.lambda_max / rate) as usize;
            scaled.max(config.min_num_time_points)
        });
        let resolution = config.lambda_max * delay / num_points as f64;

        let mode = if stochastic {
            SolverMode::Stochastic {
                completions: VecDeque::new(),
            }
        } else {
            SolverMode::Deterministic {
                reactant_history: SlidingWindow::new(num_points)?,
                intermediate_history: SlidingWindow::new(num_points)?,
                first_point: true,
            }
        };

        Ok(Self {
            name,
            reactant,
            intermediate,
            reaction,
            delay,
            rate,
            resolution,
            mode,
        })
    }

    /// A cleared copy of this solver with new history sizing.
    pub fn resized(&self, config: &DelayedSolverConfig, history_bins: Option<usize>) -> SimResult<Self> {
        Self::new(
            self.name.clone(),
            self.reactant,
            self.intermediate,
            self.reaction,
            self.delay,
            self.rate,
            self.is_stochastic(),
            config,
            history_bins,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reactant(&self) -> SymbolSlot {
        self.reactant
    }

    pub fn intermediate(&self) -> usize {
        self.intermediate
    }

    pub fn reaction_index(&self) -> usize {
        self.reaction
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn is_stochastic(&self) -> bool {
        matches!(self.mode, SolverMode::Stochastic { .. })
    }

    /// Number of molecules waiting in the queue (stochastic mode).
    pub fn pending(&self) -> usize {
        match &self.mode {
            SolverMode::Stochastic { completions } => completions.len(),
            SolverMode::Deterministic { .. } => 0,
        }
    }

    /// Schedules one completion at `time + delay`.
    pub fn add_reactant(&mut self, time: f64) -> SimResult<()> {
        match &mut self.mode {
            SolverMode::Stochastic { completions } => {
                completions.push_back(time + self.delay);
                Ok(())
            }
            SolverMode::Deterministic { .. } => Err(SimError::illegal_state(format!(
                "delayed reaction \"{}\" has no completion queue in deterministic mode",
                self.name
            ))),
        }
    }

    pub fn can_have_reaction(&self) -> bool {
        self.pending() > 0
    }

    pub fn peek_next_reaction_time(&self) -> SimResult<f64> {
        match &self.mode {
            SolverMode::Stochastic { completions } => {
                completions.front().copied().ok_or_else(|| self.empty_queue())
            }
            SolverMode::Deterministic { .. } => Err(self.empty_queue()),
        }
    }

    pub fn poll_next_reaction_time(&mut self) -> SimResult<f64> {
        let polled = match &mut self.mode {
            SolverMode::Stochastic { completions } => completions.pop_front(),
            SolverMode::Deterministic { .. } => None,
        };
        polled.ok_or_else(|| self.empty_queue())
    }

    fn empty_queue(&self) -> SimError {
        SimError::illegal_state(format!(
            "no molecules are in the queue of delayed reaction \"{}\"",
            self.name
        ))
    }

    pub fn clear(&mut self) {
        match &mut self.mode {
            SolverMode::Stochastic { completions } => completions.clear(),
            SolverMode::Deterministic {
                reactant_history,
                intermediate_history,
                first_point,
            } => {
                reactant_history.clear();
                intermediate_history.clear();
                *first_point = true;
            }
        }
    }

    /// Records reactant and intermediate levels up to `time`, one sample
    /// per `resolution`. No-op in stochastic mode.
    pub fn update(&mut self, reactant_value: f64, intermediate_value: f64, time: f64) {
        let resolution = self.resolution;
        let SolverMode::Deterministic {
            reactant_history,
            intermediate_history,
            first_point,
        } = &mut self.mode
        else {
            return;
        };

        if *first_point {
            reactant_history.insert(time, reactant_value);
            intermediate_history.insert(time, intermediate_value);
            *first_point = false;
            return;
        }

        let mut last = reactant_history.last_time();
        while time - last > resolution {
            last += resolution;
            reactant_history.insert(last, reactant_value);
            intermediate_history.insert(last, intermediate_value);
        }
    }

    /// Outflow rate of the intermediate. Always zero in stochastic mode,
    /// where completions come from the queue instead.
    pub fn compute_rate(&self, intermediate_value: f64, time: f64) -> SimResult<f64> {
        let SolverMode::Deterministic {
            reactant_history,
            intermediate_history,
            ..
        } = &self.mode
        else {
            return Ok(0.0);
        };

        let average_intermediate = intermediate_history.average();
        let min_time = reactant_history.min_time();
        let peak_time = time - self.delay;

        if !(intermediate_value > 0.0
            && average_intermediate > 0.0
            && peak_time >= min_time
            && !reactant_history.is_empty())
        {
            return Ok(0.0);
        }

        let min_intermediate = intermediate_value.min(average_intermediate);
        let expected = self.delay * self.rate * reactant_history.average();
        let excess = (min_intermediate - expected).max(0.0);

        let index = ((peak_time - min_time) / self.resolution).floor() as usize;
        let peak_value = reactant_history.value(index.min(reactant_history.len() - 1))?;

        Ok(self.rate * peak_value.max(excess))
    }

    /// Mean outflow if the current intermediate level drains over one delay.
    pub fn estimated_average_future_rate(&self, intermediate_value: f64) -> f64 {
        intermediate_value / self.delay
    }
}
