//! Ensemble averaging, sequentially and on the rayon pool.

use crn_model::{Compartment, Model, Reaction, Species};
use crn_sim::{
    GibsonBruckSimulator, GillespieSimulator, RunContext, SimError, SimulationRequest, Simulator,
    SimulatorParameters, TauLeapSimulator, simulate_parallel,
};

fn birth_death() -> Model {
    let a = Species::new("A", &Compartment::default(), 20.0);
    let mut birth = Reaction::new("birth", 4.0);
    birth.add_product(&a, 1).expect("product");
    let mut death = Reaction::new("death", 0.2);
    death.add_reactant(&a, 1).expect("reactant");
    let mut model = Model::new("birth-death");
    model.add_reaction(birth).expect("birth");
    model.add_reaction(death).expect("death");
    model
}

fn request() -> SimulationRequest {
    SimulationRequest::new(0.0, 10.0, 21, ["A"])
}

#[test]
fn parallel_matches_sequential_for_a_seed() {
    let params = SimulatorParameters {
        compute_fluctuations: true,
        ..SimulatorParameters::default()
    }
    .with_seed(1234)
    .with_ensemble_size(13);

    let mut gb = GibsonBruckSimulator::new();
    gb.initialize(&birth_death()).expect("initialize");
    let sequential = gb
        .simulate(&request(), &params, &mut RunContext::new())
        .expect("sequential");
    let parallel = simulate_parallel(&gb, &request(), &params, None).expect("parallel");
    assert_eq!(sequential, parallel);

    let mut tau = TauLeapSimulator::new();
    tau.initialize(&birth_death()).expect("initialize");
    let params = tau.default_parameters().with_seed(9).with_ensemble_size(6);
    let sequential = tau
        .simulate(&request(), &params, &mut RunContext::new())
        .expect("sequential");
    let parallel = simulate_parallel(&tau, &request(), &params, None).expect("parallel");
    assert_eq!(sequential, parallel);
}

#[test]
fn growing_an_ensemble_keeps_earlier_members() {
    let mut sim = GillespieSimulator::new();
    sim.initialize(&birth_death()).expect("initialize");
    let members: Vec<Vec<f64>> = (0..4)
        .map(|member| {
            let params = SimulatorParameters::default()
                .with_seed(77)
                .with_ensemble_size(member + 1);
            sim.simulate(&request(), &params, &mut RunContext::new())
                .expect("simulate")
                .series("A")
                .expect("A")
        })
        .collect();

    // Member k is (k+1) * mean(k+1) - k * mean(k).
    let member = |k: usize| -> Vec<f64> {
        if k == 0 {
            return members[0].clone();
        }
        members[k]
            .iter()
            .zip(&members[k - 1])
            .map(|(hi, lo)| hi * (k + 1) as f64 - lo * k as f64)
            .collect()
    };
    for k in 0..4 {
        let trajectory = member(k);
        assert_eq!(trajectory[0], 20.0);
        for v in trajectory {
            assert!((v - v.round()).abs() < 1e-9, "member {k} is not integral: {v}");
        }
    }
}

#[test]
fn fluctuations_are_sample_standard_deviations() {
    let mut sim = GibsonBruckSimulator::new();
    sim.initialize(&birth_death()).expect("initialize");
    let params = SimulatorParameters {
        compute_fluctuations: true,
        ..SimulatorParameters::default()
    }
    .with_seed(3)
    .with_ensemble_size(200);
    let results = sim
        .simulate(&request(), &params, &mut RunContext::new())
        .expect("simulate");

    // Stationary law of the birth-death process is Poisson(20).
    let mean = results.final_values().expect("final")[0];
    let spread = results.fluctuation("A").expect("fluctuation");
    assert!((mean - 20.0).abs() < 2.0, "mean = {mean}");
    assert!((spread - 20.0_f64.sqrt()).abs() < 1.0, "spread = {spread}");
}

#[test]
fn fluctuations_need_an_ensemble() {
    let mut sim = GibsonBruckSimulator::new();
    sim.initialize(&birth_death()).expect("initialize");
    let params = SimulatorParameters {
        compute_fluctuations: true,
        ..SimulatorParameters::default()
    };
    let err = sim
        .simulate(&request(), &params, &mut RunContext::new())
        .expect_err("ensemble of one");
    assert!(matches!(err, SimError::InvalidArg { .. }));
}
