mod simulate;
mod traverse;

use anyhow::Result;
use clap::{Parser, Subcommand};
use simulate::Simulate;
use tracing_subscriber::EnvFilter;
use traverse::Traverse;

#[derive(Debug, Parser)]
#[command(name = "balring-cli")]
#[command(about = "Simulate and inspect a self-balancing key partitioning ring")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Fill a ring with keys and run a random client workload against it")]
    Simulate(Simulate),

    #[command(about = "Print the traversal sequence for a ring of a given size")]
    Traverse(Traverse),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so report output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(simulate) => simulate::handle_simulate(simulate).await?,
        Commands::Traverse(traverse) => traverse::handle_traverse(traverse)?,
    }

    Ok(())
}
