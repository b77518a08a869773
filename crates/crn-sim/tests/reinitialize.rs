//! Preparing a run restores initial state after a partial trajectory.

use crn_model::{Compartment, Model, Reaction, Species};
use crn_sim::{
    GibsonBruckSimulator, RunContext, SimError, SimulationRequest, Simulator, SimulatorCore,
    SimulatorParameters,
};

fn delayed_model(initial: f64) -> Model {
    let cell = Compartment::default();
    let mut conv = Reaction::new("conv", 2.0);
    conv.add_reactant(&Species::new("A", &cell, initial), 1).expect("A");
    conv.add_product(&Species::new("B", &cell, 0.0), 1).expect("B");
    conv.set_delay(1.5).expect("delay");

    let mut decay = Reaction::new("decay", 0.1);
    decay.add_reactant(&Species::new("B", &cell, 0.0), 1).expect("B");

    let mut model = Model::new("reinit");
    model.add_reaction(conv).expect("conv");
    model.add_reaction(decay).expect("decay");
    model
}

#[test]
fn prepare_restores_populations_time_and_queues() {
    let mut core = SimulatorCore::bind(&delayed_model(50.0), true).expect("bind");
    core.prepare(0.0).expect("prepare");
    let initial = core.dynamic_values().to_vec();
    let conv = core.reaction_index("conv").expect("conv");

    core.set_time(0.7);
    core.fire(conv, 5).expect("fire");
    assert_eq!(core.solvers()[0].pending(), 5);
    assert_ne!(core.dynamic_values(), initial.as_slice());

    core.prepare(2.0).expect("prepare again");
    assert_eq!(core.dynamic_values(), initial.as_slice());
    assert_eq!(core.time(), 2.0);
    assert_eq!(core.solvers()[0].pending(), 0);
}

#[test]
fn begin_after_partial_run_starts_over() {
    let mut sim = GibsonBruckSimulator::new();
    sim.initialize(&delayed_model(50.0)).expect("initialize");
    let params = SimulatorParameters::default().with_seed(4);

    sim.begin(0.0, &params).expect("begin");
    let initial = sim.trajectory().expect("trajectory").dynamic_values().to_vec();
    let mut first = Vec::new();
    for _ in 0..40 {
        first.push(sim.step(f64::INFINITY).expect("step"));
    }
    assert!(sim.trajectory().expect("trajectory").solvers()[0].pending() > 0);

    sim.begin(0.0, &params).expect("begin again");
    let core = sim.trajectory().expect("trajectory");
    assert_eq!(core.dynamic_values(), initial.as_slice());
    assert_eq!(core.solvers()[0].pending(), 0);
    assert_eq!(core.time(), 0.0);

    let second: Vec<f64> = (0..40).map(|_| sim.step(f64::INFINITY).expect("step")).collect();
    assert_eq!(first, second);
}

#[test]
fn initialize_replaces_previous_binding() {
    let mut sim = GibsonBruckSimulator::new();
    sim.initialize(&delayed_model(50.0)).expect("initialize");
    sim.initialize(&delayed_model(7.0)).expect("initialize again");
    let core = sim.core().expect("bound");
    assert_eq!(core.num_reactions(), 3);
    assert_eq!(core.solvers().len(), 1);

    let request = SimulationRequest::new(0.0, 1.0, 2, ["A"]);
    let results = sim
        .simulate(
            &request,
            &SimulatorParameters::default().with_seed(1),
            &mut RunContext::new(),
        )
        .expect("simulate");
    assert_eq!(results.symbol_values[0], vec![7.0]);
}

#[test]
fn unbound_simulator_is_rejected() {
    let mut sim = GibsonBruckSimulator::new();
    assert!(!sim.is_initialized());
    let err = sim
        .begin(0.0, &SimulatorParameters::default())
        .expect_err("not initialized");
    assert!(matches!(err, SimError::IllegalState { .. }));
    assert!(matches!(sim.step(1.0), Err(SimError::IllegalState { .. })));
}
