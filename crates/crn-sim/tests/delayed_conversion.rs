//! `A -> B` with a fixed delay, stepped one event at a time.

use std::collections::VecDeque;

use crn_model::{Compartment, Model, Reaction, Species};
use crn_sim::decompose::{delayed_name, intermediate_name};
use crn_sim::{GibsonBruckSimulator, Simulator, SimulatorParameters};

const DELAY: f64 = 5.0;

fn conversion_model() -> Model {
    let cell = Compartment::default();
    let mut conv = Reaction::new("conv", 1.0);
    conv.add_reactant(&Species::new("A", &cell, 100.0), 1).expect("reactant");
    conv.add_product(&Species::new("B", &cell, 0.0), 1).expect("product");
    conv.set_delay(DELAY).expect("delay");
    let mut model = Model::new("delayed");
    model.add_reaction(conv).expect("reaction");
    model
}

fn dynamic(sim: &GibsonBruckSimulator, name: &str) -> f64 {
    let core = sim.trajectory().expect("trajectory in progress");
    let i = core
        .dynamic_names()
        .iter()
        .position(|n| n == name)
        .expect("dynamic species");
    core.dynamic_values()[i]
}

#[test]
fn completions_follow_enqueue_by_exactly_the_delay() {
    let mut sim = GibsonBruckSimulator::new();
    sim.initialize(&conversion_model()).expect("initialize");
    let core = sim.core().expect("bound");
    let conv = core.reaction_index("conv").expect("first half");
    let delayed = core.reaction_index(&delayed_name("conv")).expect("delayed half");
    assert_eq!(core.solvers().len(), 1);
    let intermediate = intermediate_name("conv", 0);

    sim.begin(0.0, &SimulatorParameters::default().with_seed(3))
        .expect("begin");

    let mut expected: VecDeque<f64> = VecDeque::new();
    let mut completed = 0;
    for _ in 0..1_000 {
        let pending_before = sim.last_reaction().map(|r| r.as_usize());
        let fire_time = sim.trajectory().expect("trajectory").time();
        let time = sim.step(f64::INFINITY).expect("step");
        if pending_before == Some(conv) {
            expected.push_back(fire_time + DELAY);
        }
        if !time.is_finite() {
            break;
        }

        let selected = sim.last_reaction().map(|r| r.as_usize());
        if selected == Some(delayed) {
            let due = expected.pop_front().expect("a completion was scheduled");
            assert_eq!(time, due);
            completed += 1;
        }

        let queued = sim.trajectory().expect("trajectory").solvers()[0].pending() as f64;
        let in_flight = dynamic(&sim, &intermediate);
        let popped = if selected == Some(delayed) { 1.0 } else { 0.0 };
        assert_eq!(queued, in_flight - popped);
        assert_eq!(
            dynamic(&sim, "A") + in_flight + dynamic(&sim, "B"),
            100.0,
            "molecules are conserved"
        );
    }

    assert_eq!(completed, 100);
    assert!(expected.is_empty());
    assert_eq!(dynamic(&sim, "B"), 100.0);
    assert_eq!(dynamic(&sim, &intermediate), 0.0);
}

#[test]
fn nothing_arrives_before_the_delay() {
    let mut sim = GibsonBruckSimulator::new();
    sim.initialize(&conversion_model()).expect("initialize");
    let request = crn_sim::SimulationRequest::new(0.0, 20.0, 41, ["A", "B"]);
    let results = sim
        .simulate(
            &request,
            &SimulatorParameters::default().with_seed(8),
            &mut crn_sim::RunContext::new(),
        )
        .expect("simulate");
    let b = results.series("B").expect("B");
    let times = &results.time_values;
    for (t, v) in times.iter().zip(&b) {
        if *t < DELAY {
            assert_eq!(*v, 0.0, "B produced at t = {t}");
        }
    }
    assert_eq!(b.last().copied(), Some(100.0));
}
