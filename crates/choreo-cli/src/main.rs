//! choreo CLI entry point.
//!
//! Binary name: `choreo`
//!
//! Parses CLI arguments, loads configuration, wires the simulated
//! collaborators, then dispatches to the appropriate command handler.

mod cli;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity; RUST_LOG wins when set.
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,choreo_core=debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let state = AppState::init(&cli).await?;

    match cli.command {
        Commands::Scenarios => {
            cli::scenarios::list_scenarios(cli.json)?;
        }

        Commands::Run { scenario } => {
            cli::run::run_scenario(&state, &scenario, cli.json).await?;
        }

        Commands::Playbook { scenario, repo } => {
            cli::playbook::run_playbook(&state, &scenario, &repo, cli.json).await?;
        }

        Commands::Plan { severity } => {
            cli::plan::show_plan(severity, cli.json)?;
        }

        Commands::Classify { title, description } => {
            cli::classify::classify(&state, &title, &description, cli.json).await?;
        }

        Commands::Demo { scenarios } => {
            cli::demo::run_demo(&state, scenarios, cli.json).await?;
        }
    }

    Ok(())
}
