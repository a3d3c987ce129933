use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    sync::Arc,
};

use anyhow::Context;
use neuroarcade_network::Architecture;
use neuroarcade_training::{
    agent::Agent,
    checkpoint::{self, CheckpointRecord},
};
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;

/// Writes `value` as pretty JSON to `path`, or to stdout when `None`.
pub fn write_json<T>(value: &T, path: Option<&Path>) -> anyhow::Result<()>
where
    T: serde::Serialize,
{
    let (mut writer, target): (Box<dyn Write>, String) = match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            (Box::new(BufWriter::new(file)), path.display().to_string())
        }
        None => (Box::new(io::stdout().lock()), "stdout".to_owned()),
    };
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to write JSON to {target}"))?;
    writeln!(writer).with_context(|| format!("Failed to write JSON to {target}"))?;
    writer
        .flush()
        .with_context(|| format!("Failed to flush output to {target}"))
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

/// Reads a checkpoint that must exist.
pub fn read_checkpoint(path: &Path) -> anyhow::Result<CheckpointRecord> {
    checkpoint::load(path)
        .with_context(|| format!("Failed to read checkpoint: {}", path.display()))?
        .with_context(|| format!("No checkpoint found at {}", path.display()))
}

/// Rebuilds the checkpointed agent, checking it fits `architecture`.
pub fn checkpoint_agent(
    record: &CheckpointRecord,
    architecture: Arc<Architecture>,
    path: &Path,
) -> anyhow::Result<Agent> {
    record.to_agent(architecture).with_context(|| {
        format!(
            "Checkpoint {} does not fit the configured architecture",
            path.display()
        )
    })
}

/// Random generator for a command run.
///
/// Without an explicit seed one is drawn and logged, so every run can be
/// reproduced.
pub fn seeded_rng(seed: Option<u64>) -> Pcg32 {
    let seed = seed.unwrap_or_else(|| rand::rng().random());
    eprintln!("Random seed: {seed}");
    Pcg32::seed_from_u64(seed)
}
