//! Simulator lookup by name.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crn_model::Model;
use crn_results::SimulationResults;
use serde::{Deserialize, Serialize};

use crate::controller::SimulationController;
use crate::ensemble::simulate_parallel;
use crate::error::{SimError, SimResult};
use crate::gibson_bruck::{GibsonBruck, GibsonBruckSimulator};
use crate::gillespie::{GillespieDirect, GillespieSimulator};
use crate::ode::OdeSimulator;
use crate::params::SimulatorParameters;
use crate::progress::RunContext;
use crate::simulator::{SimulationRequest, Simulator};
use crate::stochastic::{StochasticAlgorithm, StochasticSimulator};
use crate::tau_leap::{TauLeapSimple, TauLeapSimulator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SimulatorKind {
    GibsonBruck,
    GillespieDirect,
    TauLeapSimple,
    OdeRk4Fixed,
}

impl SimulatorKind {
    pub fn all() -> [SimulatorKind; 4] {
        [
            SimulatorKind::GibsonBruck,
            SimulatorKind::GillespieDirect,
            SimulatorKind::TauLeapSimple,
            SimulatorKind::OdeRk4Fixed,
        ]
    }

    pub fn alias(self) -> &'static str {
        match self {
            SimulatorKind::GibsonBruck => "gibson-bruck",
            SimulatorKind::GillespieDirect => "gillespie-direct",
            SimulatorKind::TauLeapSimple => "tauleap-simple",
            SimulatorKind::OdeRk4Fixed => "ode-rk4-fixed",
        }
    }

    pub fn is_stochastic(self) -> bool {
        !matches!(self, SimulatorKind::OdeRk4Fixed)
    }

    /// A fresh, uninitialised simulator.
    pub fn create(self) -> Box<dyn Simulator> {
        match self {
            SimulatorKind::GibsonBruck => Box::new(GibsonBruckSimulator::new()),
            SimulatorKind::GillespieDirect => Box::new(GillespieSimulator::new()),
            SimulatorKind::TauLeapSimple => Box::new(TauLeapSimulator::new()),
            SimulatorKind::OdeRk4Fixed => Box::new(OdeSimulator::new()),
        }
    }

    /// Initialises a simulator of this kind on `model` and runs `request`.
    ///
    /// Stochastic ensembles with more than one member run on the rayon
    /// pool; everything else runs on the calling thread.
    pub fn simulate_model(
        self,
        model: &Model,
        request: &SimulationRequest,
        params: &SimulatorParameters,
        controller: Option<Arc<SimulationController>>,
    ) -> SimResult<SimulationResults> {
        if params.ensemble_size > 1 {
            match self {
                SimulatorKind::GibsonBruck => {
                    return parallel::<GibsonBruck>(model, request, params, controller);
                }
                SimulatorKind::GillespieDirect => {
                    return parallel::<GillespieDirect>(model, request, params, controller);
                }
                SimulatorKind::TauLeapSimple => {
                    return parallel::<TauLeapSimple>(model, request, params, controller);
                }
                SimulatorKind::OdeRk4Fixed => {}
            }
        }
        let mut simulator = self.create();
        simulator.initialize(model)?;
        let mut ctx = RunContext::new();
        if let Some(controller) = controller {
            ctx = ctx.with_controller(controller);
        }
        simulator.simulate(request, params, &mut ctx)
    }
}

fn parallel<A: StochasticAlgorithm + Default>(
    model: &Model,
    request: &SimulationRequest,
    params: &SimulatorParameters,
    controller: Option<Arc<SimulationController>>,
) -> SimResult<SimulationResults> {
    let mut simulator = StochasticSimulator::<A>::new();
    simulator.initialize(model)?;
    simulate_parallel(&simulator, request, params, controller)
}

impl FromStr for SimulatorKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SimulatorKind::all()
            .into_iter()
            .find(|k| k.alias() == wanted)
            .ok_or_else(|| SimError::invalid_arg(format!("unknown simulator \"{s}\"")))
    }
}

impl TryFrom<String> for SimulatorKind {
    type Error = SimError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SimulatorKind> for String {
    fn from(kind: SimulatorKind) -> Self {
        kind.alias().to_string()
    }
}

impl fmt::Display for SimulatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.alias())
    }
}
