//! crn-sim: simulators for chemical reaction networks.
//!
//! Provides:
//! - Binding of a `Model` into indexed state, with multi-step and delayed
//!   reactions decomposed into chains or delayed pairs
//! - Delayed-reaction solver (stochastic queue or deterministic history)
//! - Gibson-Bruck next-reaction method with a reaction dependency graph
//! - Gillespie direct method and simple tau-leaping
//! - Fixed-step RK4 integration of the rate equations
//! - Ensemble averaging (sequential or on the rayon pool), cancellation,
//!   pause and progress reporting
//! - `SimulatorKind` lookup by name

pub mod binding;
pub mod controller;
pub mod core;
pub mod decompose;
pub mod delayed;
pub mod dependency;
pub mod ensemble;
pub mod error;
pub mod gibson_bruck;
pub mod gillespie;
pub mod integrator;
pub mod ode;
pub mod params;
pub mod progress;
pub mod queue;
pub mod registry;
pub mod simulator;
pub mod stochastic;
pub mod tau_leap;
pub mod window;

// Re-exports
pub use binding::SymbolSlot;
pub use controller::SimulationController;
pub use crate::core::{BoundReaction, SimulatorCore};
pub use delayed::DelayedReactionSolver;
pub use dependency::DependencyGraph;
pub use ensemble::simulate_parallel;
pub use error::{SimError, SimResult};
pub use gibson_bruck::{GibsonBruck, GibsonBruckSimulator};
pub use gillespie::{GillespieDirect, GillespieSimulator};
pub use integrator::{ForwardEuler, Integrator, IntegratorType, RK4, TransientModel};
pub use ode::OdeSimulator;
pub use params::{DelayedSolverConfig, SimulatorParameters};
pub use progress::{RunContext, RunStage, SimulationProgress};
pub use queue::IndexedPriorityQueue;
pub use registry::SimulatorKind;
pub use simulator::{SimulationRequest, Simulator};
pub use stochastic::{StochasticAlgorithm, StochasticSimulator, StochasticState};
pub use tau_leap::{TauLeapSimple, TauLeapSimulator};
pub use window::SlidingWindow;
