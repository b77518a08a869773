//! Deterministic simulation of the reaction-rate equations with a
//! fixed-step integrator.

use crn_core::{Timer, UpdateThrottle, ensure_finite};
use crn_model::Model;
use crn_results::SimulationResults;
use tracing::{info, warn};

use crate::core::SimulatorCore;
use crate::error::{SimError, SimResult};
use crate::integrator::{IntegratorType, TransientModel};
use crate::params::SimulatorParameters;
use crate::progress::{RunContext, RunStage, SimulationProgress, fraction_complete};
use crate::simulator::{SimulationRequest, Simulator, not_initialized};

pub const DEFAULT_MIN_NUM_STEPS: usize = 10_000;
pub const DEFAULT_MAX_ALLOWED_RELATIVE_ERROR: f64 = 1e-4;
pub const DEFAULT_MAX_ALLOWED_ABSOLUTE_ERROR: f64 = 0.01;

/// `dx/dt = Σ_j a_j(x, t) v_j` over a bound deterministic core.
struct RateEquations<'a> {
    core: &'a mut SimulatorCore,
    rates: Vec<f64>,
}

impl TransientModel for RateEquations<'_> {
    type State = Vec<f64>;

    fn rhs(&mut self, t: f64, x: &Vec<f64>) -> SimResult<Vec<f64>> {
        self.core.load_state(t, x);
        self.core.compute_rates(&mut self.rates)?;
        let mut derivative = vec![0.0; x.len()];
        self.core.compute_derivative(&self.rates, &mut derivative);
        Ok(derivative)
    }

    fn add(&self, a: &Vec<f64>, b: &Vec<f64>) -> Vec<f64> {
        a.iter().zip(b).map(|(x, y)| x + y).collect()
    }

    fn scale(&self, a: &Vec<f64>, scale: f64) -> Vec<f64> {
        a.iter().map(|x| x * scale).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct OdeSimulator {
    integrator: IntegratorType,
    core: Option<SimulatorCore>,
}

impl OdeSimulator {
    pub const NAME: &'static str = "ode-rk4-fixed";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_integrator(integrator: IntegratorType) -> Self {
        Self {
            integrator,
            core: None,
        }
    }

    pub fn integrator(&self) -> IntegratorType {
        self.integrator
    }

    pub fn core(&self) -> Option<&SimulatorCore> {
        self.core.as_ref()
    }
}

impl Simulator for OdeSimulator {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, model: &Model) -> SimResult<()> {
        self.core = None;
        let core = SimulatorCore::bind(model, false)?;
        info!(
            simulator = Self::NAME,
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
        SimulatorParameters {
            max_allowed_relative_error: Some(DEFAULT_MAX_ALLOWED_RELATIVE_ERROR),
            max_allowed_absolute_error: Some(DEFAULT_MAX_ALLOWED_ABSOLUTE_ERROR),
            min_num_steps: Some(DEFAULT_MIN_NUM_STEPS),
            ..SimulatorParameters::default()
        }
    }

    fn simulate(
        &mut self,
        request: &SimulationRequest,
        params: &SimulatorParameters,
        ctx: &mut RunContext<'_>,
    ) -> SimResult<SimulationResults> {
        request.validate()?;
        params.validate()?;
        if params.ensemble_size > 1 {
            return Err(SimError::invalid_arg(format!(
                "the deterministic simulator does not support an ensemble size of {}",
                params.ensemble_size
            )));
        }
        let bound = self.core.as_ref().ok_or_else(|| not_initialized(Self::NAME))?;
        let mut core = bound.clone();
        core.configure_delayed_solvers(&params.delay, params.num_history_bins)?;
        let times = request.time_points()?;
        let slots = core.resolve_symbols(&request.requested_symbols)?;

        // Whole steps per output interval, so every output point is a step
        // boundary.
        let intervals = times.len() - 1;
        let per_interval = params
            .min_num_steps
            .unwrap_or(DEFAULT_MIN_NUM_STEPS)
            .max(times.len())
            .div_ceil(intervals);
        let steps = per_interval * intervals;
        let (start, end) = (request.start_time, request.end_time);
        let dt = (end - start) / steps as f64;
        info!(simulator = Self::NAME, model = core.model_name(), steps, dt, "starting deterministic run");

        core.prepare(start)?;
        core.update_delayed_solvers()?;
        let model_name = core.model_name().to_string();
        let mut x = core.dynamic_values().to_vec();
        let mut equations = RateEquations {
            rates: vec![0.0; core.num_reactions()],
            core: &mut core,
        };

        let timer = Timer::start(Self::NAME);
        let mut throttle = UpdateThrottle::new(ctx.update_interval());
        let mut values = Vec::with_capacity(times.len());
        let record = |core: &SimulatorCore, t: f64, values: &mut Vec<Vec<f64>>| -> SimResult<()> {
            while values.len() < times.len() && times[values.len()] <= t {
                let mut row = vec![0.0; slots.len()];
                core.values_of(&slots, &mut row)?;
                values.push(row);
            }
            Ok(())
        };
        record(&*equations.core, start, &mut values)?;

        let mut t = start;
        for step in 1..=steps {
            x = self.integrator.step(&mut equations, t, &x, dt)?;
            for &v in &x {
                ensure_finite(v, "species population")?;
            }
            t = if step % per_interval == 0 {
                times[step / per_interval]
            } else {
                start + step as f64 * dt
            };
            equations.core.load_state(t, &x);
            equations.core.update_delayed_solvers()?;
            record(&*equations.core, t, &mut values)?;

            if step == steps || throttle.ready() {
                let cancelled = ctx.poll_cancelled();
                let stage = if cancelled {
                    RunStage::Cancelled
                } else if step == steps {
                    RunStage::Completed
                } else {
                    RunStage::Running
                };
                ctx.report(SimulationProgress {
                    fraction_complete: fraction_complete(0, 1, t, start, end),
                    iterations: step as u64,
                    sim_time: t,
                    ensemble_member: 0,
                    elapsed_wall_s: timer.elapsed_s(),
                    stage,
                });
                if cancelled {
                    warn!(time = t, "simulation cancelled; returning partial results");
                    break;
                }
            }
        }
        info!(elapsed_s = timer.elapsed_s(), "deterministic run finished");
        let reached = values.len();
        Ok(SimulationResults::new(
            model_name,
            Self::NAME,
            request.requested_symbols.clone(),
            times[..reached].to_vec(),
            values,
            None,
        )?)
    }
}
