//! Gibson–Bruck next-reaction method.

use crn_core::ReactionId;

use crate::core::SimulatorCore;
use crate::dependency::DependencyGraph;
use crate::error::SimResult;
use crate::params::SimulatorParameters;
use crate::queue::IndexedPriorityQueue;
use crate::stochastic::{StochasticAlgorithm, StochasticSimulator, StochasticState, exponential_wait};

/// Keeps one putative firing time per reaction in an indexed heap and
/// recomputes only the propensities a firing can change.
#[derive(Debug, Clone, Default)]
pub struct GibsonBruck {
    graph: DependencyGraph,
    queue: IndexedPriorityQueue,
}

pub type GibsonBruckSimulator = StochasticSimulator<GibsonBruck>;

impl GibsonBruck {
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Putative firing time of reaction `j`.
    pub fn putative_time(&self, j: usize) -> f64 {
        self.queue.key(j)
    }

    fn update_rate_and_time(
        &mut self,
        core: &SimulatorCore,
        state: &mut StochasticState,
        j: usize,
        now: f64,
        fired: bool,
    ) -> SimResult<()> {
        let old_rate = state.rates[j];
        let new_rate = core.reaction_rate(j)?;
        state.rates[j] = new_rate;
        let old_time = self.queue.key(j);
        let time = if !fired && old_rate > 0.0 && new_rate > 0.0 && old_time.is_finite() {
            (old_time - now) * old_rate / new_rate + now
        } else if new_rate > 0.0 {
            now + exponential_wait(&mut state.rng, new_rate)
        } else {
            f64::INFINITY
        };
        self.queue.update(j, time);
        Ok(())
    }
}

impl StochasticAlgorithm for GibsonBruck {
    const NAME: &'static str = "gibson-bruck";

    fn default_parameters() -> SimulatorParameters {
        SimulatorParameters::default()
    }

    fn initialize(&mut self, core: &SimulatorCore) -> SimResult<()> {
        self.graph = DependencyGraph::build(core);
        self.queue = IndexedPriorityQueue::default();
        Ok(())
    }

    fn prepare(&mut self, core: &mut SimulatorCore, state: &mut StochasticState) -> SimResult<()> {
        let now = core.time();
        core.compute_rates(&mut state.rates)?;
        let keys = state
            .rates
            .iter()
            .map(|&rate| now + exponential_wait(&mut state.rng, rate))
            .collect();
        self.queue = IndexedPriorityQueue::new(keys);
        state.last_reaction = None;
        Ok(())
    }

    fn iterate(
        &mut self,
        core: &mut SimulatorCore,
        state: &mut StochasticState,
        _horizon: f64,
    ) -> SimResult<()> {
        let now = core.time();
        let fired = state.last_reaction.take().map(ReactionId::as_usize);

        if let Some(j) = fired {
            core.fire(j, 1)?;
            self.update_rate_and_time(core, state, j, now, true)?;
            let dependents = self.graph.dependents(j).to_vec();
            for k in dependents {
                self.update_rate_and_time(core, state, k, now, false)?;
            }
        }
        let time_dependent = self.graph.time_dependent().to_vec();
        for k in time_dependent {
            let already_updated =
                fired.is_some_and(|j| j == k || self.graph.dependents(j).binary_search(&k).is_ok());
            if !already_updated {
                self.update_rate_and_time(core, state, k, now, false)?;
            }
        }

        let next = self.queue.min().filter(|&(_, t)| t.is_finite());
        let delayed = core.next_delayed_completion()?;
        match (next, delayed) {
            (next, Some((k, t))) if next.is_none_or(|(_, tn)| t < tn) => {
                core.set_time(t);
                let j = core.take_delayed_completion(k)?;
                state.last_reaction = Some(ReactionId::from_usize(j));
            }
            (Some((j, t)), _) => {
                core.set_time(t);
                state.last_reaction = Some(ReactionId::from_usize(j));
            }
            _ => core.set_time(f64::INFINITY),
        }
        Ok(())
    }
}
