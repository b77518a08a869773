//! Simple tau-leap simulator.
//!
//! Leaps fire every reaction a Poisson-distributed number of times over an
//! interval chosen so that no propensity is expected to drift by more than
//! the allowed relative error. When a leap would be shorter than a few
//! single-reaction steps, the simulator falls back to exact SSA steps.

use crn_core::sum;
use crn_expr::builder::{add, multiply, number, square};
use crn_expr::{Element, Expression};
use rand_distr::{Distribution, Poisson};
use tracing::{debug, warn};

use crate::core::SimulatorCore;
use crate::error::{SimError, SimResult};
use crate::gillespie::direct_step;
use crate::params::SimulatorParameters;
use crate::stochastic::{StochasticAlgorithm, StochasticSimulator, StochasticState};

pub const DEFAULT_MAX_ALLOWED_RELATIVE_ERROR: f64 = 0.005;
pub const DEFAULT_STEP_SIZE_FRACTION: f64 = 0.1;
/// Exact steps taken between leap checks, in units of the minimum ratio.
pub const LEAP_CHECK_MULTIPLIER: u64 = 4;
pub const MAX_FAILED_LEAP_ATTEMPTS: usize = 40;

#[derive(Debug, Clone)]
pub struct TauLeapSimple {
    allowed_error: f64,
    min_ratio: u64,
    /// Expected drift of each propensity.
    mu: Vec<Expression>,
    /// Variance rate of each propensity.
    sigma: Vec<Expression>,
    last_was_leap: bool,
    steps_since_check: u64,
    firings: Vec<f64>,
    projected: Vec<f64>,
}

pub type TauLeapSimulator = StochasticSimulator<TauLeapSimple>;

impl Default for TauLeapSimple {
    fn default() -> Self {
        Self {
            allowed_error: DEFAULT_MAX_ALLOWED_RELATIVE_ERROR,
            min_ratio: (1.0 / DEFAULT_STEP_SIZE_FRACTION) as u64,
            mu: Vec::new(),
            sigma: Vec::new(),
            last_was_leap: true,
            steps_since_check: 0,
            firings: Vec::new(),
            projected: Vec::new(),
        }
    }
}

impl TauLeapSimple {
    pub fn mu(&self) -> &[Expression] {
        &self.mu
    }

    pub fn sigma(&self) -> &[Expression] {
        &self.sigma
    }

    /// Largest leap whose expected propensity drift stays within the
    /// allowed relative error of the total propensity.
    pub fn compute_leap_time(&self, core: &SimulatorCore, total_rate: f64) -> SimResult<f64> {
        let evaluator = core.evaluator();
        let mu_factor = self.allowed_error * total_rate;
        let sigma_factor = mu_factor * mu_factor;
        let mut jump = f64::MAX;
        for (mu, sigma) in self.mu.iter().zip(&self.sigma).rev() {
            let by_mu = mu_factor / mu.evaluate(&evaluator)?.abs();
            if by_mu < jump {
                jump = by_mu;
            }
            let by_sigma = sigma_factor / sigma.evaluate(&evaluator)?;
            if by_sigma < jump {
                jump = by_sigma;
            }
        }
        Ok(jump)
    }

    /// Shrinks `leap` so that the mean number of firings cannot drive a
    /// populated species below half its current value.
    fn shrink_leap(&mut self, core: &SimulatorCore, rates: &[f64], leap: f64) -> f64 {
        for (f, &rate) in self.firings.iter_mut().zip(rates) {
            let mean = rate * leap;
            *f = if mean > 0.0 { (mean as u64) as f64 } else { 0.0 };
        }
        core.project(&self.firings, &mut self.projected);

        let mut min_fraction = 1.0_f64;
        for (&old, &new) in core.dynamic_values().iter().zip(&self.projected) {
            if old > 0.0 && new < 0.0 {
                let fraction = -0.5 * old / (new - old);
                min_fraction = min_fraction.min(fraction);
            }
        }
        if min_fraction < 1.0 { leap * min_fraction } else { leap }
    }

    /// Draws firing counts until no species goes negative.
    fn sample_firings(&mut self, core: &SimulatorCore, state: &mut StochasticState, leap: f64) -> SimResult<bool> {
        for _ in 0..MAX_FAILED_LEAP_ATTEMPTS {
            for (f, &rate) in self.firings.iter_mut().zip(&state.rates).rev() {
                let lambda = leap * rate;
                *f = if lambda <= 0.0 {
                    0.0
                } else if 1.0 / lambda.sqrt() > self.allowed_error {
                    let poisson = Poisson::new(lambda).map_err(|e| SimError::Accuracy {
                        what: format!("cannot sample firings for mean {lambda}: {e}"),
                    })?;
                    poisson.sample(&mut state.rng)
                } else {
                    lambda.round()
                };
            }
            core.project(&self.firings, &mut self.projected);
            if self.projected.iter().all(|&x| x >= 0.0) {
                return Ok(true);
            }
            debug!(leap, "leap drove a species negative; resampling");
        }
        Ok(false)
    }

    fn leap(
        &mut self,
        core: &mut SimulatorCore,
        state: &mut StochasticState,
        leap: f64,
    ) -> SimResult<()> {
        let time = core.time() + leap;
        core.set_time(time);
        state.last_reaction = None;

        if !self.sample_firings(core, state, leap)? {
            warn!(leap, time, "tau-leap became unstable");
            return Err(SimError::Accuracy {
                what: "simulation became unstable; re-run with a smaller maximum allowed relative error"
                    .to_string(),
            });
        }
        for j in 0..self.firings.len() {
            let n = self.firings[j];
            if n > 0.0 {
                core.fire(j, n as u64)?;
            }
        }

        while let Some((k, t)) = core.next_delayed_completion()? {
            if t > time {
                break;
            }
            core.complete_delayed(k)?;
        }
        Ok(())
    }
}

impl StochasticAlgorithm for TauLeapSimple {
    const NAME: &'static str = "tauleap-simple";

    fn default_parameters() -> SimulatorParameters {
        SimulatorParameters {
            max_allowed_relative_error: Some(DEFAULT_MAX_ALLOWED_RELATIVE_ERROR),
            step_size_fraction: Some(DEFAULT_STEP_SIZE_FRACTION),
            ..SimulatorParameters::default()
        }
    }

    /// Builds `mu_j = Σ_k a_k f_jk` and `sigma_j = Σ_k a_k f_jk²` where
    /// `f_jk = Σ_i v_ki ∂a_j/∂x_i`. Reactions driven by a delayed solver
    /// have no rate law and contribute nothing.
    fn initialize(&mut self, core: &SimulatorCore) -> SimResult<()> {
        if let Some(r) = core.reactions().iter().find(|r| !r.locals.is_empty()) {
            return Err(SimError::invalid_input(format!(
                "the tau-leap simulator does not support reaction-local parameters (reaction \"{}\")",
                r.name
            )));
        }

        let evaluator = core.evaluator();
        let n = core.num_reactions();
        let laws: Vec<Option<&Element>> = core
            .reactions()
            .iter()
            .map(|r| r.delayed_solver.is_none().then_some(r.law.root()))
            .collect();

        let mut mu = Vec::with_capacity(n);
        let mut sigma = Vec::with_capacity(n);
        for j in 0..n {
            let mut derivatives: Vec<Option<Element>> = vec![None; core.num_dynamic()];
            if laws[j].is_some() {
                let law = &core.reaction(j).law;
                for (i, name) in core.dynamic_names().iter().enumerate() {
                    let d = law.partial_derivative(name, &evaluator)?.into_root();
                    if !d.is_zero() {
                        derivatives[i] = Some(d);
                    }
                }
            }

            let mut mu_j = number(0.0);
            let mut sigma_j = number(0.0);
            for (k, law_k) in laws.iter().enumerate() {
                let Some(law_k) = law_k else { continue };
                if law_k.is_zero() {
                    continue;
                }
                let f = core.reaction(k).adjustments.iter().fold(number(0.0), |acc, &(i, v)| {
                    match &derivatives[i] {
                        Some(d) => add(acc, multiply(number(v), d.clone())),
                        None => acc,
                    }
                });
                if f.is_zero() {
                    continue;
                }
                mu_j = add(mu_j, multiply((*law_k).clone(), f.clone()));
                sigma_j = add(sigma_j, multiply((*law_k).clone(), square(f)));
            }
            mu.push(Expression::from_element(mu_j));
            sigma.push(Expression::from_element(sigma_j));
        }

        debug!(reactions = n, "built tau-leap drift expressions");
        self.mu = mu;
        self.sigma = sigma;
        Ok(())
    }

    fn configure(&mut self, params: &SimulatorParameters) -> SimResult<()> {
        self.allowed_error = params
            .max_allowed_relative_error
            .unwrap_or(DEFAULT_MAX_ALLOWED_RELATIVE_ERROR);
        let fraction = params.step_size_fraction.unwrap_or(DEFAULT_STEP_SIZE_FRACTION);
        self.min_ratio = (1.0 / fraction) as u64;
        Ok(())
    }

    fn prepare(&mut self, core: &mut SimulatorCore, state: &mut StochasticState) -> SimResult<()> {
        self.last_was_leap = true;
        self.steps_since_check = 0;
        self.firings = vec![0.0; core.num_reactions()];
        self.projected = vec![0.0; core.num_dynamic()];
        state.last_reaction = None;
        Ok(())
    }

    fn iterate(
        &mut self,
        core: &mut SimulatorCore,
        state: &mut StochasticState,
        horizon: f64,
    ) -> SimResult<()> {
        if let Some(id) = state.last_reaction.take() {
            core.fire(id.as_usize(), 1)?;
        }
        core.compute_rates(&mut state.rates)?;
        let total = sum(&state.rates);

        let mut leap = 0.0;
        let mut do_leap = false;
        if self.last_was_leap || self.steps_since_check >= LEAP_CHECK_MULTIPLIER * self.min_ratio {
            leap = self.compute_leap_time(core, total)?;
            if horizon.is_finite() && horizon > core.time() {
                leap = leap.min(horizon - core.time());
            }
            leap = self.shrink_leap(core, &state.rates, leap);
            do_leap = total > 0.0 && leap >= self.min_ratio as f64 / total;
            self.steps_since_check = 0;
        }
        self.last_was_leap = do_leap;

        if do_leap {
            self.leap(core, state, leap)
        } else {
            self.steps_since_check += 1;
            direct_step(core, state)
        }
    }
}
