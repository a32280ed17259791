//! Application state wiring configuration and collaborators together.
//!
//! AppState holds the loaded configuration and the simulated world every
//! command draws its collaborators from.

use std::time::Duration;

use choreo_core::collaborator::Collaborators;
use choreo_infra::config::{load_config, load_from_data_dir, resolve_data_dir};
use choreo_infra::simulated::{CallRecord, DecisionMode, SimulatedWorld};
use choreo_types::config::ChoreoConfig;

use crate::cli::Cli;

/// Shared application state used by every command.
pub struct AppState {
    pub config: ChoreoConfig,
    world: SimulatedWorld,
}

impl AppState {
    /// Load configuration and build the simulated world from CLI flags.
    pub async fn init(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = match &cli.config {
            Some(path) => {
                if !tokio::fs::try_exists(path).await? {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                load_config(path).await
            }
            None => load_from_data_dir(&data_dir).await,
        };

        let decision_mode = if cli.no_decision {
            DecisionMode::Unavailable
        } else {
            DecisionMode::Rules
        };
        let world = SimulatedWorld::new()
            .failing(cli.fail.iter().copied())
            .with_latency(Duration::from_millis(cli.latency_ms))
            .with_decision_mode(decision_mode);

        tracing::debug!(
            data_dir = %data_dir.display(),
            failing = ?cli.fail,
            no_decision = cli.no_decision,
            "state initialized"
        );

        Ok(Self { config, world })
    }

    /// A fresh wiring of the simulated collaborators.
    pub fn collaborators(&self) -> Collaborators {
        self.world.collaborators()
    }

    pub async fn calls(&self) -> Vec<CallRecord> {
        self.world.calls().await
    }
}
