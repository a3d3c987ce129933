use std::path::PathBuf;

use chrono::{DateTime, Utc};
use neuroarcade_training::stats::GeneStats;
use serde::Serialize;

use crate::{config::RunConfig, util};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct InspectArg {
    /// Checkpoint file to inspect
    checkpoint: PathBuf,
    /// Run configuration file (JSON); defaults to the two-game network
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write the summary JSON here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct CheckpointSummary {
    fitness: f32,
    generation: u64,
    saved_at: Option<DateTime<Utc>>,
    genome_size: usize,
    genes: GeneStats,
}

pub(crate) fn run(arg: &InspectArg) -> anyhow::Result<()> {
    let config = RunConfig::load(arg.config.as_deref())?;
    let architecture = config.build_architecture()?;
    let record = util::read_checkpoint(&arg.checkpoint)?;
    let agent = util::checkpoint_agent(&record, architecture, &arg.checkpoint)?;

    let genes = GeneStats::new(agent.genome().genes().iter().copied()).unwrap_or_default();
    eprintln!("Checkpoint {}", arg.checkpoint.display());
    eprintln!("  Generation: {}", record.generation);
    eprintln!("  Fitness:    {:.3}", record.fitness);
    match record.saved_at {
        Some(saved_at) => eprintln!("  Saved at:   {saved_at}"),
        None => eprintln!("  Saved at:   unknown"),
    }
    eprintln!("  Genes:      {}", genes.count);
    eprintln!("    Range:    [{:.3}, {:.3}]", genes.min, genes.max);
    eprintln!("    Mean |g|: {:.3}", genes.mean_abs);
    eprintln!("    Outside [-1, 1]: {}", genes.outside_init_range);

    let summary = CheckpointSummary {
        fitness: record.fitness,
        generation: record.generation,
        saved_at: record.saved_at,
        genome_size: agent.genome().len(),
        genes,
    };
    util::write_json(&summary, arg.output.as_deref())
}
