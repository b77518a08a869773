//! Every registered simulator runs the same model by name.

use std::str::FromStr;

use crn_model::{Compartment, Model, Reaction, Species};
use crn_sim::{SimulationRequest, SimulatorKind, SimulatorParameters};

fn dimerisation() -> Model {
    let cell = Compartment::default();
    let (a, b) = (Species::new("A", &cell, 200.0), Species::new("B", &cell, 0.0));
    let mut dimerise = Reaction::new("dimerise", 0.002);
    dimerise.add_reactant(&a, 2).expect("A");
    dimerise.add_product(&b, 1).expect("B");
    let mut split = Reaction::new("split", 0.1);
    split.add_reactant(&b, 1).expect("B");
    split.add_product(&a, 2).expect("A");
    let mut model = Model::new("dimerisation");
    model.add_reaction(dimerise).expect("dimerise");
    model.add_reaction(split).expect("split");
    model
}

#[test]
fn every_kind_conserves_monomers() {
    let request = SimulationRequest::new(0.0, 5.0, 11, ["A", "B"]);
    for kind in SimulatorKind::all() {
        let simulator = kind.create();
        let params = simulator.default_parameters().with_seed(21);
        let results = kind
            .simulate_model(&dimerisation(), &request, &params, None)
            .unwrap_or_else(|e| panic!("{kind} failed: {e}"));
        assert_eq!(results.simulator, kind.alias());
        assert_eq!(results.num_points(), 11);
        for row in &results.symbol_values {
            assert!((row[0] + 2.0 * row[1] - 200.0).abs() < 1e-6, "{kind}: {row:?}");
        }
    }
}

#[test]
fn stochastic_kinds_average_in_parallel() {
    let request = SimulationRequest::new(0.0, 5.0, 6, ["B"]);
    let params = SimulatorParameters::default()
        .with_seed(2)
        .with_ensemble_size(8);
    for kind in SimulatorKind::all().into_iter().filter(|k| k.is_stochastic()) {
        let results = kind
            .simulate_model(&dimerisation(), &request, &params, None)
            .expect("parallel ensemble");
        assert_eq!(results.num_points(), 6);
        assert_eq!(results.symbol_values[0], vec![0.0]);
    }
    assert!(
        SimulatorKind::OdeRk4Fixed
            .simulate_model(&dimerisation(), &request, &params, None)
            .is_err()
    );
}

#[test]
fn lookup_by_alias() {
    assert_eq!(
        SimulatorKind::from_str("ode-rk4-fixed").expect("alias"),
        SimulatorKind::OdeRk4Fixed
    );
    let names: Vec<String> = SimulatorKind::all().iter().map(ToString::to_string).collect();
    assert_eq!(
        names,
        ["gibson-bruck", "gillespie-direct", "tauleap-simple", "ode-rk4-fixed"]
    );
}
