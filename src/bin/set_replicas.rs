//! set-replicas - sets `spec.replicas` on every Deployment of a ResourceList.
//!
//! The replica count is read from the functionConfig, either a ConfigMap
//! with `data.replicas` or a `fn.kpt.dev/v1alpha1` `SetReplicas` object, or
//! given with `--replicas`.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;
use tracing::{error, info};

use krm_fn::object::selector::is_gvk;
use krm_fn::resourcelist::{execute, Context, Result as FnResult, RunnerProcessor};
use krm_fn::{KubeObject, KubeObjects, ResourceList, ResourceListProcessor, Results, Runner, Severity};

#[derive(Parser, Debug)]
#[command(name = "set-replicas", version, about = "Set spec.replicas on Deployments")]
struct Cli {
    /// ResourceList to read. Use '-' for stdin.
    #[arg(short = 'i', long = "input", default_value = "-")]
    input: String,
    /// Where to write the ResourceList. Use '-' for stdout.
    #[arg(short = 'o', long = "output", default_value = "-")]
    output: String,
    /// Replica count, overriding the functionConfig.
    #[arg(long = "replicas")]
    replicas: Option<i64>,
}

/// Replica count as found in the functionConfig. ConfigMap data is always
/// a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Count {
    Int(i64),
    Str(String),
}

#[derive(Debug, Default, Deserialize)]
struct SetReplicas {
    #[serde(default)]
    replicas: Option<Count>,
}

impl Runner for SetReplicas {
    const KIND: &'static str = "SetReplicas";

    fn run(&mut self, _ctx: &Context, _fc: &KubeObject, items: &KubeObjects, results: &mut Results) -> bool {
        let replicas = match &self.replicas {
            Some(Count::Int(n)) => *n,
            Some(Count::Str(s)) => match s.trim().parse() {
                Ok(n) => n,
                Err(e) => {
                    results.error(format!("invalid replicas {:?}: {}", s, e));
                    return false;
                }
            },
            None => {
                results.error("`replicas` is required");
                return false;
            }
        };
        for deployment in items.where_(is_gvk("apps", "", "Deployment")).iter() {
            if let Err(e) = deployment.set(&replicas, &["spec", "replicas"]) {
                results.push(FnResult::config_object(e.to_string(), Severity::Error, deployment));
                return false;
            }
            results.push(FnResult::config_object(
                format!("set replicas to {}", replicas),
                Severity::Info,
                deployment,
            ));
        }
        true
    }
}

/// Runs [`SetReplicas`] with a fixed count, ignoring the functionConfig.
struct Fixed(i64);

impl ResourceListProcessor for Fixed {
    fn process(&mut self, rl: &mut ResourceList) -> krm_fn::Result<bool> {
        let mut runner = SetReplicas {
            replicas: Some(Count::Int(self.0)),
        };
        let ctx = Context::new("SetReplicas");
        let mut results = Results::new();
        let pass = runner.run(&ctx, &rl.function_config, &rl.items, &mut results);
        rl.results.extend(results);
        Ok(pass)
    }
}

fn main() -> ExitCode {
    krm_fn::log::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!(error = %e, "set-replicas failed");
        eprintln!("Error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let input: Box<dyn Read> = if cli.input == "-" {
        Box::new(io::stdin())
    } else {
        Box::new(fs::File::open(PathBuf::from(&cli.input)).map_err(|e| format!("Failed to open input {:?}: {}", cli.input, e))?)
    };
    let output: Box<dyn Write> = if cli.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(fs::File::create(&cli.output).map_err(|e| format!("Failed to create output file {:?}: {}", cli.output, e))?)
    };

    let mut processor: Box<dyn ResourceListProcessor> = match cli.replicas {
        Some(n) => {
            info!(replicas = n, "using replicas from the command line");
            Box::new(Fixed(n))
        }
        None => Box::new(RunnerProcessor::<SetReplicas>::new()),
    };
    execute(processor.as_mut(), input, output)?;
    Ok(())
}
