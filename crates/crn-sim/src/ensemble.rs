//! Ensemble averaging, and parallel execution of ensemble members.

use std::ops::Range;
use std::sync::Arc;

use crn_results::SimulationResults;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::controller::SimulationController;
use crate::error::SimResult;
use crate::params::SimulatorParameters;
use crate::progress::DEFAULT_UPDATE_INTERVAL;
use crate::simulator::SimulationRequest;
use crate::stochastic::{
    PreparedRun, StochasticAlgorithm, StochasticSimulator, Tick, Trajectory, TrajectoryPlan,
    derive_seed, run_trajectory,
};

/// Sums trajectories point by point, in the order they are added.
#[derive(Debug, Clone)]
pub(crate) struct EnsembleAccumulator {
    sums: Vec<Vec<f64>>,
    counts: Vec<usize>,
    finals: Option<Vec<Vec<f64>>>,
}

impl EnsembleAccumulator {
    pub fn new(num_points: usize, num_symbols: usize, keep_finals: bool) -> Self {
        Self {
            sums: vec![vec![0.0; num_symbols]; num_points],
            counts: vec![0; num_points],
            finals: keep_finals.then(Vec::new),
        }
    }

    pub fn add(&mut self, trajectory: &Trajectory) {
        for ((sum, count), row) in self.sums.iter_mut().zip(&mut self.counts).zip(&trajectory.values) {
            for (s, v) in sum.iter_mut().zip(row) {
                *s += v;
            }
            *count += 1;
        }
        if let Some(finals) = self.finals.as_mut()
            && trajectory.values.len() == self.sums.len()
            && let Some(last) = trajectory.values.last()
        {
            finals.push(last.clone());
        }
    }

    /// Averages every point at least one trajectory reached. Points after
    /// a cancellation are dropped.
    pub fn finish(
        self,
        model_name: &str,
        simulator: &str,
        symbol_names: Vec<String>,
        times: &[f64],
    ) -> SimResult<SimulationResults> {
        let reached = self.counts.iter().take_while(|&&c| c > 0).count();
        let values = self
            .sums
            .into_iter()
            .zip(&self.counts)
            .take(reached)
            .map(|(sum, &count)| sum.into_iter().map(|s| s / count as f64).collect())
            .collect();
        let fluctuations = self
            .finals
            .filter(|finals| finals.len() >= 2)
            .map(|finals| sample_std_dev(&finals, symbol_names.len()));
        Ok(SimulationResults::new(
            model_name,
            simulator,
            symbol_names,
            times[..reached].to_vec(),
            values,
            fluctuations,
        )?)
    }
}

/// Per-column `sqrt(Σ(avg − x)² / (n − 1))`.
fn sample_std_dev(rows: &[Vec<f64>], columns: usize) -> Vec<f64> {
    let n = rows.len() as f64;
    (0..columns)
        .map(|c| {
            let avg = rows.iter().map(|r| r[c]).sum::<f64>() / n;
            let squares: f64 = rows.iter().map(|r| (avg - r[c]).powi(2)).sum();
            (squares / (n - 1.0)).sqrt()
        })
        .collect()
}

/// Runs the ensemble members of a stochastic simulation on the rayon pool.
///
/// Each worker owns a copy of the bound model and runs a contiguous range
/// of members. Member seeds and summation order match `Simulator::simulate`,
/// so both produce the same results for the same seed. Cancellation and
/// pause are honoured through `controller` before each member and during
/// it; no progress events are emitted.
pub fn simulate_parallel<A: StochasticAlgorithm>(
    simulator: &StochasticSimulator<A>,
    request: &SimulationRequest,
    params: &SimulatorParameters,
    controller: Option<Arc<SimulationController>>,
) -> SimResult<SimulationResults> {
    let PreparedRun {
        core,
        algorithm,
        times,
        slots,
        base_seed,
    } = simulator.prepare_run(request, params)?;
    let ensemble_size = params.ensemble_size;
    let workers = rayon::current_num_threads().clamp(1, ensemble_size);
    let chunk = ensemble_size.div_ceil(workers);
    info!(
        simulator = A::NAME,
        model = core.model_name(),
        ensemble_size,
        workers,
        "starting parallel ensemble"
    );

    let plan = TrajectoryPlan {
        times: &times,
        slots: &slots,
        start_time: request.start_time,
        update_interval: DEFAULT_UPDATE_INTERVAL,
    };
    let jobs: Vec<(Range<usize>, _, A)> = (0..ensemble_size)
        .step_by(chunk)
        .map(|first| (first..(first + chunk).min(ensemble_size), core.clone(), algorithm.clone()))
        .collect();

    let batches = jobs
        .into_par_iter()
        .map(|(members, mut core, mut algorithm)| -> SimResult<Vec<Trajectory>> {
            let mut monitor = |_: Tick| controller.as_ref().is_some_and(|c| c.handle_pause_or_cancel());
            let mut out = Vec::with_capacity(members.len());
            for member in members {
                if controller.as_ref().is_some_and(|c| c.handle_pause_or_cancel()) {
                    warn!(member, "parallel ensemble cancelled before member started");
                    break;
                }
                let seed = derive_seed(base_seed, member as u64);
                let trajectory = run_trajectory(&mut core, &mut algorithm, &plan, seed, &mut monitor)?;
                let cancelled = trajectory.cancelled;
                out.push(trajectory);
                if cancelled {
                    warn!(member, "parallel ensemble cancelled");
                    break;
                }
            }
            Ok(out)
        })
        .collect::<SimResult<Vec<_>>>()?;

    let mut accumulator = EnsembleAccumulator::new(times.len(), slots.len(), params.compute_fluctuations);
    for trajectory in batches.iter().flatten() {
        accumulator.add(trajectory);
    }
    accumulator.finish(
        core.model_name(),
        A::NAME,
        request.requested_symbols.clone(),
        &times,
    )
}
