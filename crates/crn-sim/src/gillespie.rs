//! Gillespie direct method.

use crn_core::{ReactionId, sum};

use crate::core::SimulatorCore;
use crate::error::SimResult;
use crate::params::SimulatorParameters;
use crate::stochastic::{
    StochasticAlgorithm, StochasticSimulator, StochasticState, choose_reaction, exponential_wait,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct GillespieDirect;

pub type GillespieSimulator = StochasticSimulator<GillespieDirect>;

/// One exact SSA step: apply the pending reaction, then pick either the
/// earliest delayed completion or a reaction drawn by propensity.
pub(crate) fn direct_step(core: &mut SimulatorCore, state: &mut StochasticState) -> SimResult<()> {
    let total = sum(&state.rates);
    let now = core.time();
    let dt = exponential_wait(&mut state.rng, total);

    if let Some((k, t)) = core.next_delayed_completion()?
        && t < now + dt
    {
        core.set_time(t);
        let j = core.take_delayed_completion(k)?;
        state.last_reaction = Some(ReactionId::from_usize(j));
        return Ok(());
    }

    match choose_reaction(&mut state.rng, &state.rates, total) {
        Some(j) if total > 0.0 => {
            core.set_time(now + dt);
            state.last_reaction = Some(ReactionId::from_usize(j));
        }
        _ => {
            core.set_time(f64::INFINITY);
            state.last_reaction = None;
        }
    }
    Ok(())
}

impl StochasticAlgorithm for GillespieDirect {
    const NAME: &'static str = "gillespie-direct";

    fn default_parameters() -> SimulatorParameters {
        SimulatorParameters::default()
    }

    fn initialize(&mut self, _core: &SimulatorCore) -> SimResult<()> {
        Ok(())
    }

    fn prepare(&mut self, _core: &mut SimulatorCore, state: &mut StochasticState) -> SimResult<()> {
        state.last_reaction = None;
        Ok(())
    }

    fn iterate(
        &mut self,
        core: &mut SimulatorCore,
        state: &mut StochasticState,
        _horizon: f64,
    ) -> SimResult<()> {
        if let Some(id) = state.last_reaction.take() {
            core.fire(id.as_usize(), 1)?;
        }
        core.compute_rates(&mut state.rates)?;
        direct_step(core, state)
    }
}
