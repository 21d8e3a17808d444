#![forbid(unsafe_code)]

//! Reference scenario runner.
//!
//! Runs every reference dropdown scenario (or those whose name contains one
//! of the command-line filters) and prints a JSON summary.
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=fdash_runtime=debug cargo run -p fdash-harness -- multi
//! FDASH_CONFIG=fdash.toml cargo run -p fdash-harness --features config
//! ```

use std::process::ExitCode;

use fdash_harness::fixtures::{ScenarioOutcome, scenarios};
use fdash_runtime::RuntimeConfig;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct Failure {
    name: &'static str,
    error: String,
}

#[derive(Debug, Serialize)]
struct Summary {
    passed: Vec<ScenarioOutcome>,
    failed: Vec<Failure>,
}

fn load_config() -> Result<RuntimeConfig, String> {
    #[cfg(feature = "config")]
    if let Ok(path) = std::env::var("FDASH_CONFIG") {
        let config = if path.ends_with(".json") {
            RuntimeConfig::from_json_file(&path)
        } else {
            RuntimeConfig::from_toml_file(&path)
        };
        return config
            .map(RuntimeConfig::with_env_overrides)
            .map_err(|err| format!("{path}: {err}"));
    }
    let config = RuntimeConfig::from_env();
    let problems = config.validate();
    if problems.is_empty() {
        Ok(config)
    } else {
        Err(problems.join("; "))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let filters: Vec<String> = std::env::args().skip(1).collect();

    let mut summary = Summary {
        passed: Vec::new(),
        failed: Vec::new(),
    };
    for scenario in scenarios() {
        if !filters.is_empty() && !filters.iter().any(|f| scenario.name.contains(f.as_str())) {
            continue;
        }
        match scenario.execute(config.clone()) {
            Ok(outcome) => {
                info!(
                    scenario = scenario.name,
                    cycles = outcome.cycles,
                    computations_run = outcome.computations_run,
                    "scenario passed"
                );
                summary.passed.push(outcome);
            }
            Err(err) => {
                error!(scenario = scenario.name, error = %err, "scenario failed");
                summary.failed.push(Failure {
                    name: scenario.name,
                    error: err.to_string(),
                });
            }
        }
    }

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => println!("{json}"),
        Err(err) => error!(error = %err, "failed to serialize summary"),
    }
    if summary.failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
