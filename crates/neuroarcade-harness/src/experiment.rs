//! Side-by-side comparison of evolution settings.
//!
//! Each [`ExperimentConfig`] owns an independent population and
//! [`Trainer`]. An [`ExperimentSet`] advances all of them one generation at a
//! time, every experiment in its own world, and returns one labelled report
//! per experiment so their progress can be compared.

use neuroarcade_training::genetic::{EvolverConfigError, Population, PopulationEvolver};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    episode::{EpisodeLimits, Harness, HarnessError},
    trainer::{GenerationReport, TrainError, Trainer},
    world::{GameKind, GameWorld},
};

/// Population size used when a configuration omits it.
pub const DEFAULT_POPULATION_SIZE: usize = 50;

/// One evolution setup to compare against others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Display name; derived from the parameters when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub game: GameKind,
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    #[serde(default)]
    pub evolution: PopulationEvolver,
}

fn default_population_size() -> usize {
    DEFAULT_POPULATION_SIZE
}

impl ExperimentConfig {
    #[must_use]
    pub fn new(game: GameKind, population_size: usize, evolution: PopulationEvolver) -> Self {
        Self {
            label: None,
            game,
            population_size,
            evolution,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The explicit label, or one built from the evolution parameters.
    #[must_use]
    pub fn label(&self) -> String {
        self.label.clone().unwrap_or_else(|| {
            format!(
                "mut={:.2}, top={:.2}, agents={}",
                self.evolution.mutation_rate, self.evolution.retain_top, self.population_size
            )
        })
    }

    pub fn validate(&self) -> Result<(), ExperimentError> {
        if self.population_size == 0 {
            return Err(ExperimentError::EmptyPopulation {
                label: self.label(),
            });
        }
        self.evolution
            .validate()
            .map_err(|source| ExperimentError::InvalidEvolver {
                label: self.label(),
                source,
            })
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ExperimentError {
    #[display("experiment '{label}' needs at least one agent")]
    EmptyPopulation { label: String },
    #[display("experiment '{label}' has invalid evolution parameters")]
    InvalidEvolver {
        label: String,
        source: EvolverConfigError,
    },
    #[display("experiment '{label}' cannot be played by this network")]
    Unplayable { label: String, source: HarnessError },
    #[display("experiment '{label}' failed")]
    Train { label: String, source: TrainError },
}

/// One experiment's view of a finished generation.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub label: String,
    pub game: GameKind,
    pub population_size: usize,
    pub report: GenerationReport,
}

#[derive(Debug)]
struct Experiment {
    label: String,
    config: ExperimentConfig,
    trainer: Trainer,
}

/// Experiments advanced in lockstep, one world each.
#[derive(Debug)]
pub struct ExperimentSet {
    experiments: Vec<Experiment>,
}

impl ExperimentSet {
    /// Samples a fresh population for every configuration.
    ///
    /// Every experiment shares the network architecture of `harness`.
    ///
    /// # Panics
    ///
    /// Panics if `configs` is empty.
    pub fn new<R>(
        harness: &Harness,
        configs: &[ExperimentConfig],
        rng: &mut R,
    ) -> Result<Self, ExperimentError>
    where
        R: Rng + ?Sized,
    {
        assert!(!configs.is_empty(), "at least one experiment is required");

        let mut experiments = Vec::with_capacity(configs.len());
        for config in configs {
            config.validate()?;
            let label = config.label();
            if !harness.supports(config.game) {
                return Err(ExperimentError::Unplayable {
                    label,
                    source: HarnessError::MissingHead { game: config.game },
                });
            }
            let population =
                Population::random(harness.architecture(), config.population_size, rng);
            let trainer = Trainer::new(harness.clone(), population, config.evolution);
            experiments.push(Experiment {
                label,
                config: config.clone(),
                trainer,
            });
        }
        Ok(Self { experiments })
    }

    /// Applies `limits` to every experiment's episodes.
    #[must_use]
    pub fn with_limits(mut self, limits: EpisodeLimits) -> Self {
        self.experiments = self
            .experiments
            .into_iter()
            .map(|mut experiment| {
                experiment.trainer = experiment.trainer.with_limits(limits);
                experiment
            })
            .collect();
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    /// Labels in configuration order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.experiments.iter().map(|e| e.label.as_str())
    }

    /// The trainer of the `index`-th experiment.
    #[must_use]
    pub fn trainer(&self, index: usize) -> &Trainer {
        &self.experiments[index].trainer
    }

    /// Runs one generation of every experiment.
    ///
    /// `worlds[i]` hosts the `i`-th experiment and must play its game with
    /// one avatar per agent.
    ///
    /// # Panics
    ///
    /// Panics if the number of worlds differs from the number of experiments
    /// or a world plays another game than its experiment.
    pub fn run_generation<R>(
        &mut self,
        worlds: &mut [&mut dyn GameWorld],
        rng: &mut R,
    ) -> Result<Vec<ExperimentReport>, ExperimentError>
    where
        R: Rng + ?Sized,
    {
        assert_eq!(
            worlds.len(),
            self.experiments.len(),
            "every experiment needs its own world"
        );

        let mut reports = Vec::with_capacity(self.experiments.len());
        for (experiment, world) in self.experiments.iter_mut().zip(worlds.iter_mut()) {
            assert_eq!(
                world.game(),
                experiment.config.game,
                "world of experiment '{}' plays the wrong game",
                experiment.label
            );
            let report = experiment
                .trainer
                .run_generation(&mut [&mut **world], rng)
                .map_err(|source| ExperimentError::Train {
                    label: experiment.label.clone(),
                    source,
                })?;
            reports.push(ExperimentReport {
                label: experiment.label.clone(),
                game: experiment.config.game,
                population_size: experiment.config.population_size,
                report,
            });
        }
        Ok(reports)
    }
}
