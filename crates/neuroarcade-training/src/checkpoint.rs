//! Persistence of the best agent seen so far.
//!
//! A checkpoint is a single pretty-printed JSON record:
//!
//! ```json
//! {
//!   "genome": [0.12, -0.5, ...],
//!   "fitness": 143.0,
//!   "generation": 27,
//!   "saved_at": "2026-01-04T12:00:00Z"
//! }
//! ```
//!
//! `saved_at` is optional when loading. Whether the genome length fits an
//! architecture is checked by [`CheckpointRecord::to_agent`], not here.
//!
//! Writes go to a sibling `.tmp` file which is synced and then renamed over
//! the target, so a reader never observes a half-written record.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use neuroarcade_network::{Architecture, InvalidGenomeLength};
use serde::{Deserialize, Serialize};

use crate::agent::Agent;

/// The stored `(genome, fitness, generation)` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub genome: Vec<f32>,
    pub fitness: f32,
    pub generation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl CheckpointRecord {
    #[must_use]
    pub fn new(genome: Vec<f32>, fitness: f32, generation: u64) -> Self {
        Self {
            genome,
            fitness,
            generation,
            saved_at: None,
        }
    }

    /// Captures `agent`'s genome, stamped with the current time.
    #[must_use]
    pub fn from_agent(agent: &Agent, fitness: f32, generation: u64) -> Self {
        Self {
            genome: agent.genome().genes().to_vec(),
            fitness,
            generation,
            saved_at: Some(Utc::now()),
        }
    }

    /// Rebuilds the stored agent for `architecture`.
    pub fn to_agent(&self, architecture: Arc<Architecture>) -> Result<Agent, InvalidGenomeLength> {
        Agent::from_genes(architecture, self.genome.clone())
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum CheckpointError {
    #[display("failed to access checkpoint {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("corrupt checkpoint {}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("refusing to save non-finite fitness {fitness}")]
    NonFiniteFitness { fitness: f32 },
}

impl CheckpointError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_owned(),
            source,
        }
    }
}

/// Reads the record at `path`.
///
/// Returns `Ok(None)` if nothing has been saved there yet.
pub fn load<P>(path: P) -> Result<Option<CheckpointRecord>, CheckpointError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(CheckpointError::io(path, err)),
    };
    match serde_json::from_reader(BufReader::new(file)) {
        Ok(record) => Ok(Some(record)),
        Err(err) if err.is_io() => Err(CheckpointError::io(path, err.into())),
        Err(source) => Err(CheckpointError::Corrupt {
            path: path.to_owned(),
            source,
        }),
    }
}

/// Writes `record` to `path`, replacing whatever was there.
///
/// Missing parent directories are created.
pub fn save<P>(record: &CheckpointRecord, path: P) -> Result<(), CheckpointError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !record.fitness.is_finite() {
        return Err(CheckpointError::NonFiniteFitness {
            fitness: record.fitness,
        });
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| CheckpointError::io(parent, err))?;
    }

    let tmp_path = tmp_path_for(path);
    let result = write_synced(record, &tmp_path)
        .and_then(|()| fs::rename(&tmp_path, path).map_err(|err| CheckpointError::io(path, err)));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Saves `record` only if no checkpoint exists at `path` or `record` is
/// strictly fitter than the stored one.
///
/// Returns whether the record was written. A corrupt existing checkpoint is
/// reported as an error rather than silently overwritten.
pub fn save_if_better<P>(record: &CheckpointRecord, path: P) -> Result<bool, CheckpointError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !record.fitness.is_finite() {
        return Err(CheckpointError::NonFiniteFitness {
            fitness: record.fitness,
        });
    }
    if let Some(existing) = load(path)?
        && record.fitness <= existing.fitness
    {
        return Ok(false);
    }
    save(record, path)?;
    Ok(true)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_synced(record: &CheckpointRecord, path: &Path) -> Result<(), CheckpointError> {
    let file = File::create(path).map_err(|err| CheckpointError::io(path, err))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, record).map_err(|err| {
        if err.is_io() {
            CheckpointError::io(path, err.into())
        } else {
            CheckpointError::Corrupt {
                path: path.to_owned(),
                source: err,
            }
        }
    })?;
    writeln!(writer).map_err(|err| CheckpointError::io(path, err))?;
    let file = writer
        .into_inner()
        .map_err(|err| CheckpointError::io(path, err.into_error()))?;
    file.sync_all().map_err(|err| CheckpointError::io(path, err))
}

#[cfg(test)]
mod tests {
    use neuroarcade_network::ArchitectureConfig;
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "neuroarcade-checkpoint-{}-{name}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_load_missing_is_none() {
        let dir = scratch_dir("missing");
        assert!(load(dir.join("best.json")).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = scratch_dir("round-trip");
        let path = dir.join("nested").join("best.json");
        let mut record = CheckpointRecord::new(vec![0.1, -2.75, 1.0e-7, 3.5], 42.5, 7);
        record.saved_at = Some(Utc::now());

        assert!(save_if_better(&record, &path).unwrap());
        assert_eq!(load(&path).unwrap(), Some(record));
        assert!(!path.with_file_name("best.json.tmp").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_only_strictly_better_overwrites() {
        let dir = scratch_dir("strict");
        let path = dir.join("best.json");
        let first = CheckpointRecord::new(vec![1.0; 3], 10.0, 1);
        assert!(save_if_better(&first, &path).unwrap());

        let lower = CheckpointRecord::new(vec![2.0; 3], 5.0, 2);
        assert!(!save_if_better(&lower, &path).unwrap());
        let equal = CheckpointRecord::new(vec![3.0; 3], 10.0, 3);
        assert!(!save_if_better(&equal, &path).unwrap());
        assert_eq!(load(&path).unwrap(), Some(first));

        let higher = CheckpointRecord::new(vec![4.0; 3], 10.5, 4);
        assert!(save_if_better(&higher, &path).unwrap());
        assert_eq!(load(&path).unwrap(), Some(higher));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_saved_at_is_optional() {
        let dir = scratch_dir("no-timestamp");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("best.json");
        fs::write(&path, r#"{ "genome": [0.5], "fitness": 1.0, "generation": 0 }"#).unwrap();
        let record = load(&path).unwrap().unwrap();
        assert_eq!(record, CheckpointRecord::new(vec![0.5], 1.0, 0));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_corrupt_is_distinct_from_missing() {
        let dir = scratch_dir("corrupt");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("best.json");
        fs::write(&path, r#"{ "genome": [0.5], "generation": 0 }"#).unwrap();

        assert!(matches!(load(&path), Err(CheckpointError::Corrupt { .. })));
        let record = CheckpointRecord::new(vec![1.0], 100.0, 1);
        assert!(matches!(
            save_if_better(&record, &path),
            Err(CheckpointError::Corrupt { .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_truncated_file_is_corrupt() {
        let dir = scratch_dir("truncated");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("best.json");
        fs::write(&path, "").unwrap();
        assert!(matches!(load(&path), Err(CheckpointError::Corrupt { .. })));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unreadable_path_is_io() {
        let dir = scratch_dir("unreadable");
        fs::create_dir_all(&dir).unwrap();
        match load(&dir) {
            Err(CheckpointError::Io { path, .. }) => assert_eq!(path, dir),
            other => panic!("expected an I/O error, got {other:?}"),
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unwritable_path_is_io() {
        let dir = scratch_dir("unwritable");
        fs::create_dir_all(&dir).unwrap();
        let plain = dir.join("plain");
        fs::write(&plain, "not a directory").unwrap();

        let record = CheckpointRecord::new(vec![1.0], 5.0, 1);
        assert!(matches!(
            save_if_better(&record, plain.join("best.json")),
            Err(CheckpointError::Io { .. })
        ));
        assert!(matches!(
            save(&record, plain.join("best.json")),
            Err(CheckpointError::Io { .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_non_finite_fitness_is_refused() {
        let dir = scratch_dir("non-finite");
        let path = dir.join("best.json");
        for fitness in [f32::NAN, f32::INFINITY] {
            let record = CheckpointRecord::new(vec![1.0], fitness, 1);
            assert!(matches!(
                save_if_better(&record, &path),
                Err(CheckpointError::NonFiniteFitness { .. })
            ));
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_agent_round_trip_checks_length() {
        let architecture = Arc::new(ArchitectureConfig::dual_game(5, 4).build().unwrap());
        let mut rng = Pcg32::seed_from_u64(31);
        let agent = Agent::random(Arc::clone(&architecture), &mut rng);

        let record = CheckpointRecord::from_agent(&agent, 12.0, 3);
        assert!(record.saved_at.is_some());
        let restored = record.to_agent(Arc::clone(&architecture)).unwrap();
        assert_eq!(restored.genome(), agent.genome());

        let smaller = Arc::new(ArchitectureConfig::dual_game(5, 2).build().unwrap());
        let err = record.to_agent(smaller).unwrap_err();
        assert_eq!(err.actual, 47);
    }
}
