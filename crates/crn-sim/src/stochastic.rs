//! Shared machinery of the stochastic simulators.
//!
//! An algorithm implements `StochasticAlgorithm`; `StochasticSimulator`
//! wraps it with binding, the per-trajectory run loop, ensemble averaging,
//! progress and cancellation.

use std::time::Duration;

use crn_core::{ReactionId, Timer, UpdateThrottle};
use crn_model::Model;
use crn_results::SimulationResults;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::binding::SymbolSlot;
use crate::core::SimulatorCore;
use crate::ensemble::EnsembleAccumulator;
use crate::error::{SimError, SimResult};
use crate::params::SimulatorParameters;
use crate::progress::{RunContext, RunStage, SimulationProgress, fraction_complete};
use crate::simulator::{SimulationRequest, Simulator, not_initialized};

/// Mutable per-trajectory state handed to the algorithm.
#[derive(Debug, Clone)]
pub struct StochasticState {
    pub rng: ChaCha8Rng,
    /// Reaction selected by the previous iteration, applied at the start of
    /// the next one.
    pub last_reaction: Option<ReactionId>,
    pub rates: Vec<f64>,
    pub iterations: u64,
}

impl StochasticState {
    pub fn new(seed: u64, num_reactions: usize) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            last_reaction: None,
            rates: vec![0.0; num_reactions],
            iterations: 0,
        }
    }
}

pub trait StochasticAlgorithm: Clone + Send {
    /// Registry alias.
    const NAME: &'static str;

    fn default_parameters() -> SimulatorParameters;

    /// Builds per-model data. Called once per `Simulator::initialize`.
    fn initialize(&mut self, core: &SimulatorCore) -> SimResult<()>;

    /// Reads run parameters.
    fn configure(&mut self, _params: &SimulatorParameters) -> SimResult<()> {
        Ok(())
    }

    /// Resets per-trajectory data after the core has been prepared.
    fn prepare(&mut self, core: &mut SimulatorCore, state: &mut StochasticState) -> SimResult<()>;

    /// Advances the clock to the next event. `horizon` is the next output
    /// time; algorithms that move state in bulk do not step past it.
    fn iterate(
        &mut self,
        core: &mut SimulatorCore,
        state: &mut StochasticState,
        horizon: f64,
    ) -> SimResult<()>;
}

/// Waiting time of an exponential law with the given rate; infinite when
/// nothing can fire.
pub fn exponential_wait<R: Rng + ?Sized>(rng: &mut R, rate: f64) -> f64 {
    if rate > 0.0 {
        let u = 1.0 - rng.r#gen::<f64>();
        (1.0 / u).ln() / rate
    } else {
        f64::INFINITY
    }
}

/// Picks reaction `j` with probability `rates[j] / total`. The cumulative
/// sum runs from the last reaction down; rounding that overshoots falls
/// back to the lowest reaction with a positive rate.
pub fn choose_reaction<R: Rng + ?Sized>(rng: &mut R, rates: &[f64], total: f64) -> Option<usize> {
    let target = rng.r#gen::<f64>() * total;
    let mut cumulative = 0.0;
    let mut lowest_positive = None;
    for (j, &rate) in rates.iter().enumerate().rev() {
        if rate <= 0.0 {
            continue;
        }
        cumulative += rate;
        if target < cumulative {
            return Some(j);
        }
        lowest_positive = Some(j);
    }
    lowest_positive
}

/// Rounds fractional populations to `floor(x)` or `floor(x) + 1`, the
/// latter with probability equal to the fractional part.
pub fn integerize<R: Rng + ?Sized>(core: &mut SimulatorCore, rng: &mut R) {
    core.map_dynamic(|_, x| {
        let floor = x.floor();
        let fraction = x - floor;
        if fraction > 0.0 && rng.r#gen::<f64>() < fraction {
            floor + 1.0
        } else {
            floor
        }
    });
}

/// Seed of ensemble member `member` (SplitMix64 over the run seed).
pub fn derive_seed(seed: u64, member: u64) -> u64 {
    const GOLDEN_GAMMA: u64 = 0x9E3779B97F4A7C15;
    let mut z = seed ^ member.wrapping_mul(GOLDEN_GAMMA);
    z = z.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Observation passed to a trajectory's monitor.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Tick {
    pub sim_time: f64,
    pub iterations: u64,
    pub finished: bool,
}

/// Samples of one trajectory: `values[point][symbol]` for every output
/// point reached.
#[derive(Debug, Clone, Default)]
pub(crate) struct Trajectory {
    pub values: Vec<Vec<f64>>,
    pub iterations: u64,
    pub cancelled: bool,
}

/// Everything a trajectory needs besides the core and the algorithm.
pub(crate) struct TrajectoryPlan<'a> {
    pub times: &'a [f64],
    pub slots: &'a [SymbolSlot],
    pub start_time: f64,
    pub update_interval: Duration,
}

/// Runs one trajectory. `monitor` is called at most once per update
/// interval and once at the end; returning true cancels the run.
pub(crate) fn run_trajectory<A: StochasticAlgorithm>(
    core: &mut SimulatorCore,
    algorithm: &mut A,
    plan: &TrajectoryPlan<'_>,
    seed: u64,
    monitor: &mut dyn FnMut(Tick) -> bool,
) -> SimResult<Trajectory> {
    let mut state = StochasticState::new(seed, core.num_reactions());
    core.prepare(plan.start_time)?;
    integerize(core, &mut state.rng);
    core.check_initial_countable()?;
    algorithm.prepare(core, &mut state)?;

    let mut trajectory = Trajectory {
        values: Vec::with_capacity(plan.times.len()),
        ..Trajectory::default()
    };
    let mut throttle = UpdateThrottle::new(plan.update_interval);
    let mut point = 0;

    while point < plan.times.len() {
        algorithm.iterate(core, &mut state, plan.times[point])?;
        state.iterations += 1;
        let time = core.time();

        if throttle.ready()
            && monitor(Tick {
                sim_time: time,
                iterations: state.iterations,
                finished: false,
            })
        {
            trajectory.cancelled = true;
            break;
        }

        if time >= plan.times[point] {
            core.invalidate();
            core.check_countable()?;
            while point < plan.times.len() && time >= plan.times[point] {
                let mut row = vec![0.0; plan.slots.len()];
                core.values_of(plan.slots, &mut row)?;
                trajectory.values.push(row);
                point += 1;
            }
        }
    }

    trajectory.iterations = state.iterations;
    if !trajectory.cancelled {
        trajectory.cancelled = monitor(Tick {
            sim_time: core.time(),
            iterations: state.iterations,
            finished: true,
        });
    }
    Ok(trajectory)
}

/// A bound, ready-to-run copy of a simulator's state.
pub(crate) struct PreparedRun<A> {
    pub core: SimulatorCore,
    pub algorithm: A,
    pub times: Vec<f64>,
    pub slots: Vec<SymbolSlot>,
    pub base_seed: u64,
}

/// Stochastic simulator generic over its event-selection algorithm.
#[derive(Debug, Clone, Default)]
pub struct StochasticSimulator<A> {
    algorithm: A,
    core: Option<SimulatorCore>,
    stepping: Option<(SimulatorCore, A, StochasticState)>,
}

impl<A: StochasticAlgorithm + Default> StochasticSimulator<A> {
    pub fn new() -> Self {
        Self::with_algorithm(A::default())
    }
}

impl<A: StochasticAlgorithm> StochasticSimulator<A> {
    pub fn with_algorithm(algorithm: A) -> Self {
        Self {
            algorithm,
            core: None,
            stepping: None,
        }
    }

    pub fn algorithm(&self) -> &A {
        &self.algorithm
    }

    /// The bound model, if initialized.
    pub fn core(&self) -> Option<&SimulatorCore> {
        self.core.as_ref()
    }

    pub(crate) fn prepare_run(
        &self,
        request: &SimulationRequest,
        params: &SimulatorParameters,
    ) -> SimResult<PreparedRun<A>> {
        request.validate()?;
        params.validate()?;
        let bound = self.core.as_ref().ok_or_else(|| not_initialized(A::NAME))?;
        let mut core = bound.clone();
        core.configure_delayed_solvers(&params.delay, params.num_history_bins)?;
        let mut algorithm = self.algorithm.clone();
        algorithm.configure(params)?;
        let times = request.time_points()?;
        let slots = core.resolve_symbols(&request.requested_symbols)?;
        let base_seed = params.seed.unwrap_or_else(rand::random);
        Ok(PreparedRun {
            core,
            algorithm,
            times,
            slots,
            base_seed,
        })
    }

    /// Starts a single trajectory for manual stepping. The trajectory is the
    /// one `simulate` produces for ensemble member 0 under the same seed.
    pub fn begin(&mut self, start_time: f64, params: &SimulatorParameters) -> SimResult<()> {
        params.validate()?;
        let bound = self.core.as_ref().ok_or_else(|| not_initialized(A::NAME))?;
        let mut core = bound.clone();
        core.configure_delayed_solvers(&params.delay, params.num_history_bins)?;
        let mut algorithm = self.algorithm.clone();
        algorithm.configure(params)?;
        let seed = derive_seed(params.seed.unwrap_or_else(rand::random), 0);
        let mut state = StochasticState::new(seed, core.num_reactions());
        core.prepare(start_time)?;
        integerize(&mut core, &mut state.rng);
        core.check_initial_countable()?;
        algorithm.prepare(&mut core, &mut state)?;
        self.stepping = Some((core, algorithm, state));
        Ok(())
    }

    /// One iteration of the trajectory started by `begin`. Returns the new
    /// simulation time.
    pub fn step(&mut self, horizon: f64) -> SimResult<f64> {
        let (core, algorithm, state) = self.stepping.as_mut().ok_or_else(|| {
            SimError::illegal_state("no trajectory in progress; call begin first")
        })?;
        algorithm.iterate(core, state, horizon)?;
        state.iterations += 1;
        Ok(core.time())
    }

    /// State of the trajectory started by `begin`.
    pub fn trajectory(&self) -> Option<&SimulatorCore> {
        self.stepping.as_ref().map(|(core, _, _)| core)
    }

    /// Reaction selected by the last `step`, not yet applied.
    pub fn last_reaction(&self) -> Option<ReactionId> {
        self.stepping.as_ref().and_then(|(_, _, state)| state.last_reaction)
    }
}

impl<A: StochasticAlgorithm> Simulator for StochasticSimulator<A> {
    fn name(&self) -> &'static str {
        A::NAME
    }

    fn initialize(&mut self, model: &Model) -> SimResult<()> {
        self.core = None;
        self.stepping = None;
        let core = SimulatorCore::bind(model, true)?;
        self.algorithm.initialize(&core)?;
        info!(
            simulator = A::NAME,
            model = model.name(),
            reactions = core.num_reactions(),
            species = core.num_dynamic(),
            delayed_solvers = core.solvers().len(),
            "simulator initialized"
        );
        self.core = Some(core);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.core.is_some()
    }

    fn default_parameters(&self) -> SimulatorParameters {
        A::default_parameters()
    }

    fn simulate(
        &mut self,
        request: &SimulationRequest,
        params: &SimulatorParameters,
        ctx: &mut RunContext<'_>,
    ) -> SimResult<SimulationResults> {
        let PreparedRun {
            mut core,
            mut algorithm,
            times,
            slots,
            base_seed,
        } = self.prepare_run(request, params)?;
        let ensemble_size = params.ensemble_size;
        info!(
            simulator = A::NAME,
            model = core.model_name(),
            ensemble_size,
            points = times.len(),
            "starting stochastic run"
        );

        let timer = Timer::start(A::NAME);
        let plan = TrajectoryPlan {
            times: &times,
            slots: &slots,
            start_time: request.start_time,
            update_interval: ctx.update_interval(),
        };
        let mut accumulator =
            EnsembleAccumulator::new(times.len(), slots.len(), params.compute_fluctuations);

        for member in 0..ensemble_size {
            let mut monitor = |tick: Tick| {
                let cancelled = ctx.poll_cancelled();
                let stage = if cancelled {
                    RunStage::Cancelled
                } else if tick.finished && member + 1 == ensemble_size {
                    RunStage::Completed
                } else {
                    RunStage::Running
                };
                ctx.report(SimulationProgress {
                    fraction_complete: fraction_complete(
                        member,
                        ensemble_size,
                        tick.sim_time,
                        request.start_time,
                        request.end_time,
                    ),
                    iterations: tick.iterations,
                    sim_time: tick.sim_time,
                    ensemble_member: member,
                    elapsed_wall_s: timer.elapsed_s(),
                    stage,
                });
                cancelled
            };
            let seed = derive_seed(base_seed, member as u64);
            let trajectory = run_trajectory(&mut core, &mut algorithm, &plan, seed, &mut monitor)?;
            debug!(member, iterations = trajectory.iterations, "trajectory finished");
            let cancelled = trajectory.cancelled;
            accumulator.add(&trajectory);
            if cancelled {
                warn!(member, "simulation cancelled; returning partial results");
                break;
            }
        }

        info!(elapsed_s = timer.elapsed_s(), "stochastic run finished");
        accumulator.finish(
            core.model_name(),
            A::NAME,
            request.requested_symbols.clone(),
            &times,
        )
    }
}
