use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use neuroarcade_harness::features::FEATURE_COUNT;
use neuroarcade_network::{Architecture, ArchitectureConfig, architecture::DEFAULT_HIDDEN_UNITS};
use neuroarcade_training::genetic::PopulationEvolver;
use serde::{Deserialize, Serialize};

use crate::util;

const DEFAULT_CHECKPOINT_PATH: &str = "model/multigame_best.json";

/// Settings shared by every command, loaded from `--config`.
///
/// Omitted sections fall back to the two-game network and default evolution
/// parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct RunConfig {
    pub architecture: ArchitectureConfig,
    pub evolution: PopulationEvolver,
    pub checkpoint: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            architecture: ArchitectureConfig::dual_game(FEATURE_COUNT, DEFAULT_HIDDEN_UNITS),
            evolution: PopulationEvolver::default(),
            checkpoint: PathBuf::from(DEFAULT_CHECKPOINT_PATH),
        }
    }
}

impl RunConfig {
    pub(crate) fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let config: Self = util::read_json_file("run configuration", path)?;
        config
            .evolution
            .validate()
            .with_context(|| format!("Invalid evolution parameters in {}", path.display()))?;
        Ok(config)
    }

    pub(crate) fn build_architecture(&self) -> anyhow::Result<Arc<Architecture>> {
        let architecture = self
            .architecture
            .build()
            .context("Invalid network architecture")?;
        Ok(Arc::new(architecture))
    }
}
