//! Benchmark harness: runs registered simulators over built-in reaction
//! networks and aggregates wall time and iteration counts.

use std::path::Path;
use std::time::Instant;

use crn_core::AccumulatingTimer;
use crn_model::{Compartment, Model, ModelError, Parameter, Reaction, Species, Value};
use crn_results::{ResultsError, RunManifest, RunStore, SimulationResults, compute_run_id};
use crn_sim::{
    RunContext, SimError, SimulationProgress, SimulationRequest, SimulatorKind,
    SimulatorParameters,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error("Simulation error: {0}")]
    Sim(#[from] SimError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Results error: {0}")]
    Results(#[from] ResultsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type BenchResult<T> = Result<T, BenchError>;

/// Built-in reaction networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioModel {
    /// `0 -> A` at 10, `A -> 0` at 0.1 per molecule.
    BirthDeath,
    /// `2A <-> B`.
    Dimerisation,
    /// `A -> B` with a delay of 5.
    DelayedConversion,
}

impl ScenarioModel {
    pub fn build(self) -> BenchResult<Model> {
        let cell = Compartment::default();
        let model = match self {
            ScenarioModel::BirthDeath => {
                let a = Species::new("A", &cell, 0.0);
                let mut birth = Reaction::new("birth", 10.0);
                birth.add_product(&a, 1)?;
                let mut death = Reaction::new("death", 0.1);
                death.add_reactant(&a, 1)?;
                let mut model = Model::new("birth-death");
                model.add_reaction(birth)?;
                model.add_reaction(death)?;
                model
            }
            ScenarioModel::Dimerisation => {
                let a = Species::new("A", &cell, 1_000.0);
                let b = Species::new("B", &cell, 0.0);
                let mut model = Model::new("dimerisation");
                model.add_parameter(Parameter::new("kf", 0.0005))?;
                model.add_parameter(Parameter::new("kr", 0.05))?;
                let mut forward = Reaction::new("dimerise", Value::parse("kf * A * (A - 1)")?);
                forward.add_reactant(&a, 2)?;
                forward.add_product(&b, 1)?;
                let mut reverse = Reaction::new("split", Value::parse("kr * B")?);
                reverse.add_reactant(&b, 1)?;
                reverse.add_product(&a, 2)?;
                model.add_reaction(forward)?;
                model.add_reaction(reverse)?;
                model
            }
            ScenarioModel::DelayedConversion => {
                let mut conv = Reaction::new("conv", 1.0);
                conv.add_reactant(&Species::new("A", &cell, 100.0), 1)?;
                conv.add_product(&Species::new("B", &cell, 0.0), 1)?;
                conv.set_delay(5.0)?;
                let mut model = Model::new("delayed-conversion");
                model.add_reaction(conv)?;
                model
            }
        };
        Ok(model)
    }
}

/// A benchmark scenario definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkScenario {
    pub id: String,
    pub name: String,
    pub model: ScenarioModel,
    pub end_time: f64,
    pub num_points: usize,
    pub ensemble_size: usize,
    pub symbols: Vec<String>,
    pub notes: Option<String>,
}

impl BenchmarkScenario {
    pub fn build_model(&self) -> BenchResult<Model> {
        self.model.build()
    }

    pub fn request(&self) -> SimulationRequest {
        SimulationRequest::new(0.0, self.end_time, self.num_points, self.symbols.iter().cloned())
    }

    /// Parameters for `kind`: its defaults plus the scenario's ensemble and
    /// the fixed seed. Deterministic simulators always run one member.
    pub fn parameters(&self, kind: SimulatorKind, seed: u64) -> SimulatorParameters {
        let defaults = kind.create().default_parameters().with_seed(seed);
        if kind.is_stochastic() {
            defaults.with_ensemble_size(self.ensemble_size)
        } else {
            defaults
        }
    }
}

/// One timed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total_time_s: f64,
    pub initialize_time_s: f64,
    pub simulate_time_s: f64,
    /// Iterations summed over ensemble members, from the last progress
    /// event of each member.
    pub iterations: u64,
    pub final_values: Vec<f64>,
}

/// Aggregated statistics for multiple runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub run_count: usize,
    pub total_time_median_s: f64,
    pub total_time_min_s: f64,
    pub total_time_max_s: f64,
    pub simulate_time_mean_s: f64,
    pub iterations_median: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub scenario: BenchmarkScenario,
    pub simulator: SimulatorKind,
    pub runs: Vec<RunMetrics>,
    pub aggregate: AggregateMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSuite {
    pub timestamp: String,
    pub results: Vec<BenchmarkResult>,
}

impl BenchmarkSuite {
    pub fn new(results: Vec<BenchmarkResult>) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            results,
        }
    }

    pub fn save_json(&self, path: &Path) -> BenchResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Runs `scenario` on `kind` `times` times, each with the same seed.
/// The results of the last run are returned alongside the metrics.
pub fn run_scenario(
    scenario: &BenchmarkScenario,
    kind: SimulatorKind,
    times: usize,
    seed: u64,
) -> BenchResult<(BenchmarkResult, Option<SimulationResults>)> {
    let model = scenario.build_model()?;
    let request = scenario.request();
    let params = scenario.parameters(kind, seed);
    let simulate_timer = AccumulatingTimer::new();

    let mut runs = Vec::with_capacity(times);
    let mut last = None;
    for run in 0..times {
        let wall = Instant::now();
        let mut simulator = kind.create();
        simulator.initialize(&model)?;
        let initialize_time_s = wall.elapsed().as_secs_f64();

        let mut member_iterations: Vec<u64> = Vec::new();
        let mut on_progress = |p: SimulationProgress| {
            if member_iterations.len() <= p.ensemble_member {
                member_iterations.resize(p.ensemble_member + 1, 0);
            }
            member_iterations[p.ensemble_member] = p.iterations;
        };
        let started = Instant::now();
        let results = {
            let mut ctx = RunContext::new().with_progress(&mut on_progress);
            simulator.simulate(&request, &params, &mut ctx)?
        };
        let simulate_time_s = started.elapsed().as_secs_f64();
        simulate_timer.record(simulate_time_s);

        let metrics = RunMetrics {
            total_time_s: wall.elapsed().as_secs_f64(),
            initialize_time_s,
            simulate_time_s,
            iterations: member_iterations.iter().sum(),
            final_values: results.final_values().map(<[f64]>::to_vec).unwrap_or_default(),
        };
        debug!(scenario = %scenario.id, simulator = %kind, run, total_s = metrics.total_time_s, "benchmark run");
        runs.push(metrics);
        last = Some(results);
    }

    let mut aggregate = compute_aggregates(&runs);
    aggregate.simulate_time_mean_s = simulate_timer.average_seconds();
    info!(
        scenario = %scenario.id,
        simulator = %kind,
        median_s = aggregate.total_time_median_s,
        "scenario finished"
    );
    Ok((
        BenchmarkResult {
            scenario: scenario.clone(),
            simulator: kind,
            runs,
            aggregate,
        },
        last,
    ))
}

fn median<T: Copy>(sorted: &[T]) -> Option<T> {
    sorted.get(sorted.len() / 2).copied()
}

fn compute_aggregates(runs: &[RunMetrics]) -> AggregateMetrics {
    if runs.is_empty() {
        return AggregateMetrics::default();
    }

    let mut total_times: Vec<f64> = runs.iter().map(|r| r.total_time_s).collect();
    total_times.sort_by(f64::total_cmp);
    let mut iterations: Vec<u64> = runs.iter().map(|r| r.iterations).collect();
    iterations.sort_unstable();

    AggregateMetrics {
        run_count: runs.len(),
        total_time_median_s: median(&total_times).unwrap_or(0.0),
        total_time_min_s: total_times[0],
        total_time_max_s: total_times[total_times.len() - 1],
        simulate_time_mean_s: runs.iter().map(|r| r.simulate_time_s).sum::<f64>() / runs.len() as f64,
        iterations_median: median(&iterations).unwrap_or(0),
    }
}

/// Text that identifies a scenario's model for run hashing.
fn model_text(model: &Model) -> String {
    model
        .reactions()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Stores `results` under a run id derived from the scenario, simulator
/// and parameters. Returns the run id.
pub fn store_results(
    store: &RunStore,
    scenario: &BenchmarkScenario,
    kind: SimulatorKind,
    seed: u64,
    results: &SimulationResults,
) -> BenchResult<String> {
    let model = scenario.build_model()?;
    let params = scenario.parameters(kind, seed);
    let run_id = compute_run_id(&model_text(&model), kind.alias(), &params);
    let manifest = RunManifest::for_results(run_id.clone(), results, params.ensemble_size, params.seed);
    store.save_run(&manifest, results)?;
    Ok(run_id)
}

pub fn default_benchmarks() -> Vec<BenchmarkScenario> {
    vec![
        BenchmarkScenario {
            id: "birth-death".to_string(),
            name: "Birth-death process".to_string(),
            model: ScenarioModel::BirthDeath,
            end_time: 100.0,
            num_points: 101,
            ensemble_size: 20,
            symbols: vec!["A".to_string()],
            notes: Some("Steady state Poisson(100)".to_string()),
        },
        BenchmarkScenario {
            id: "dimerisation".to_string(),
            name: "Reversible dimerisation".to_string(),
            model: ScenarioModel::Dimerisation,
            end_time: 20.0,
            num_points: 41,
            ensemble_size: 10,
            symbols: vec!["A".to_string(), "B".to_string()],
            notes: Some("Expression rate laws over global parameters".to_string()),
        },
        BenchmarkScenario {
            id: "delayed-conversion".to_string(),
            name: "Delayed conversion".to_string(),
            model: ScenarioModel::DelayedConversion,
            end_time: 20.0,
            num_points: 41,
            ensemble_size: 10,
            symbols: vec!["A".to_string(), "B".to_string()],
            notes: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_benchmarks_build() {
        let benchmarks = default_benchmarks();
        assert_eq!(benchmarks.len(), 3);
        for scenario in &benchmarks {
            let model = scenario.build_model().expect("model");
            assert!(!model.reactions().is_empty());
            scenario.request().validate().expect("request");
        }
    }

    #[test]
    fn aggregate_metrics_compute_correctly() {
        let runs = vec![
            RunMetrics {
                total_time_s: 3.0,
                simulate_time_s: 2.0,
                iterations: 30,
                ..Default::default()
            },
            RunMetrics {
                total_time_s: 1.0,
                simulate_time_s: 0.5,
                iterations: 10,
                ..Default::default()
            },
            RunMetrics {
                total_time_s: 2.0,
                simulate_time_s: 0.5,
                iterations: 20,
                ..Default::default()
            },
        ];
        let agg = compute_aggregates(&runs);
        assert_eq!(agg.run_count, 3);
        assert_eq!(agg.total_time_median_s, 2.0);
        assert_eq!(agg.total_time_min_s, 1.0);
        assert_eq!(agg.total_time_max_s, 3.0);
        assert_eq!(agg.simulate_time_mean_s, 1.0);
        assert_eq!(agg.iterations_median, 20);

        assert_eq!(compute_aggregates(&[]), AggregateMetrics::default());
    }

    #[test]
    fn ode_runs_a_single_member() {
        let scenario = &default_benchmarks()[0];
        assert_eq!(scenario.parameters(SimulatorKind::OdeRk4Fixed, 1).ensemble_size, 1);
        assert_eq!(scenario.parameters(SimulatorKind::GibsonBruck, 1).ensemble_size, 20);
        let tau = scenario.parameters(SimulatorKind::TauLeapSimple, 1);
        assert_eq!(tau.max_allowed_relative_error, Some(0.005));
    }

    #[test]
    fn scenario_runs_and_stores() {
        let mut scenario = default_benchmarks().remove(2);
        scenario.ensemble_size = 2;
        let (result, last) =
            run_scenario(&scenario, SimulatorKind::GillespieDirect, 2, 7).expect("benchmark");
        assert_eq!(result.runs.len(), 2);
        assert!(result.aggregate.iterations_median > 0);
        // Same seed, same answer.
        assert_eq!(result.runs[0].final_values, result.runs[1].final_values);
        assert_eq!(result.runs[0].final_values, vec![0.0, 100.0]);

        let dir = std::env::temp_dir().join(format!("crn-bench-store-{}", std::process::id()));
        let store = RunStore::new(dir.clone()).expect("store");
        let results = last.expect("results");
        let run_id = store_results(&store, &scenario, SimulatorKind::GillespieDirect, 7, &results)
            .expect("store run");
        assert!(store.has_run(&run_id));
        assert_eq!(store.load_results(&run_id).expect("load"), results);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn suite_serializes() {
        let suite = BenchmarkSuite::new(Vec::new());
        let json = serde_json::to_string(&suite).expect("serialize");
        let back: BenchmarkSuite = serde_json::from_str(&json).expect("deserialize");
        assert!(back.results.is_empty());
    }
}
