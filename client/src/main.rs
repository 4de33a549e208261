//! Command-line front end: submit a model file and print the outcome.

use anyhow::Context;
use clap::Parser;
use client::{ConjureClient, SolveOptions, DEFAULT_DOMAIN};
use std::path::PathBuf;

#[derive(Debug, Parser)]
struct Args {
    /// Essence model file to solve
    model: PathBuf,

    /// Optional JSON parameter file
    #[arg(long)]
    data: Option<PathBuf>,

    /// Solver passed through to the service
    #[arg(long, default_value = protocol::DEFAULT_SOLVER)]
    solver: String,

    /// Extra option forwarded to the solving tool, may repeat
    #[arg(long = "option")]
    options: Vec<String>,

    /// Service endpoint
    #[arg(long, env = "CONJURE_AAS_DOMAIN", default_value = DEFAULT_DOMAIN)]
    domain: String,

    /// Application name recorded in the service's logs
    #[arg(long, default_value = "conjure-client")]
    app_name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let model = std::fs::read_to_string(&args.model)
        .with_context(|| format!("reading {}", args.model.display()))?;
    let data = match &args.data {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Some(
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?,
            )
        }
        None => None,
    };

    let client = ConjureClient::with_domain(args.app_name, args.domain);
    let options = SolveOptions {
        data,
        solver: args.solver,
        conjure_options: args.options,
    };
    let outcome = client.solve(&model, &options).await?;
    match outcome.solution {
        Some(solution) => println!("{}", serde_json::to_string_pretty(&solution)?),
        None => {
            eprintln!("{}", outcome.status);
            for line in &outcome.logs {
                eprintln!("{line}");
            }
            std::process::exit(1);
        }
    }
    Ok(())
}
