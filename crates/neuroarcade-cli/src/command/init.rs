use std::path::PathBuf;

use anyhow::{Context as _, bail};
use neuroarcade_training::{
    agent::Agent,
    checkpoint::{self, CheckpointRecord},
};

use crate::{config::RunConfig, util};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct InitArg {
    /// Run configuration file (JSON); defaults to the two-game network
    #[arg(long)]
    config: Option<PathBuf>,
    /// Checkpoint to create; defaults to the configured checkpoint path
    #[arg(long)]
    output: Option<PathBuf>,
    /// Seed for reproducible gene sampling
    #[arg(long)]
    seed: Option<u64>,
    /// Replace an existing checkpoint
    #[arg(long)]
    force: bool,
}

pub(crate) fn run(arg: &InitArg) -> anyhow::Result<()> {
    let config = RunConfig::load(arg.config.as_deref())?;
    let architecture = config.build_architecture()?;
    let path = arg.output.as_ref().unwrap_or(&config.checkpoint);

    if !arg.force && path.exists() {
        bail!(
            "Checkpoint {} already exists; pass --force to replace it",
            path.display()
        );
    }

    let mut rng = util::seeded_rng(arg.seed);
    let agent = Agent::random(architecture, &mut rng);
    let record = CheckpointRecord::from_agent(&agent, 0.0, 0);
    checkpoint::save(&record, path)
        .with_context(|| format!("Failed to write checkpoint: {}", path.display()))?;

    eprintln!("Checkpoint created");
    eprintln!("  Path: {}", path.display());
    eprintln!("  Genes: {}", record.genome.len());
    if let Some(saved_at) = record.saved_at {
        eprintln!("  Saved at: {saved_at}");
    }
    Ok(())
}
