//! Standalone benchmark runner. Logging is controlled by `RUST_LOG`.

use std::path::PathBuf;

use clap::Parser;
use crn_bench::{BenchmarkSuite, default_benchmarks, run_scenario, store_results};
use crn_results::RunStore;
use crn_sim::SimulatorKind;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "crn-bench")]
#[command(about = "Benchmark the reaction network simulators on built-in scenarios", long_about = None)]
struct Cli {
    /// Timed runs per scenario and simulator
    #[arg(long, default_value_t = 5)]
    runs: usize,
    /// Random seed shared by every run
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Run only this simulator (e.g. gibson-bruck); all when omitted
    #[arg(long)]
    simulator: Option<SimulatorKind>,
    /// Where to write the JSON report
    #[arg(long, default_value = "benchmarks/baseline.json")]
    out: PathBuf,
    /// Save the last run of each pair into this run store
    #[arg(long)]
    store: Option<PathBuf>,
}

impl Cli {
    fn simulators(&self) -> Vec<SimulatorKind> {
        match self.simulator {
            Some(kind) => vec![kind],
            None => SimulatorKind::all().to_vec(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let options = Cli::parse();
    let simulators = options.simulators();
    let store = options.store.clone().map(RunStore::new).transpose()?;
    let benchmarks = default_benchmarks();

    println!("CRN Benchmark Suite");
    println!("===================\n");
    println!(
        "Running {} scenarios on {} simulators, {} runs each...\n",
        benchmarks.len(),
        simulators.len(),
        options.runs
    );

    let mut results = Vec::new();
    for scenario in &benchmarks {
        for &kind in &simulators {
            print!("{} / {} ... ", scenario.name, kind);
            std::io::Write::flush(&mut std::io::stdout())?;

            match run_scenario(scenario, kind, options.runs, options.seed) {
                Ok((result, last)) => {
                    println!("OK ({:.4}s median)", result.aggregate.total_time_median_s);
                    if let (Some(store), Some(last)) = (&store, &last) {
                        let run_id = store_results(store, scenario, kind, options.seed, last)?;
                        println!("  stored as {run_id}");
                    }
                    results.push(result);
                }
                Err(e) => {
                    println!("FAILED");
                    eprintln!("  Error: {e}");
                }
            }
        }
    }

    println!("\nSummary");
    println!("=======\n");
    for result in &results {
        let agg = &result.aggregate;
        println!("{} / {}", result.scenario.name, result.simulator);
        println!(
            "  Total time:  {:.4}s (median), min: {:.4}s, max: {:.4}s",
            agg.total_time_median_s, agg.total_time_min_s, agg.total_time_max_s
        );
        println!("  Iterations:  {} (median)", agg.iterations_median);
        println!();
    }

    BenchmarkSuite::new(results).save_json(&options.out)?;
    println!("Baseline saved to: {}", options.out.display());
    Ok(())
}
