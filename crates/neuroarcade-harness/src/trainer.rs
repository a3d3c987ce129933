//! The generation loop: evaluate, checkpoint, evolve.

use std::path::PathBuf;

use neuroarcade_training::{
    checkpoint::{self, CheckpointError, CheckpointRecord},
    genetic::{Population, PopulationEvolver},
    stats::{FitnessStats, GeneStats},
};
use rand::Rng;
use serde::Serialize;

use crate::{
    episode::{EpisodeLimits, Harness, HarnessError, StopReason},
    fitness::FitnessCombination,
    world::{GameKind, GameWorld},
};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainError {
    #[display("failed to evaluate the population")]
    Harness(HarnessError),
    #[display("failed to update the checkpoint")]
    Checkpoint(CheckpointError),
}

/// How one game went for the whole population.
#[derive(Debug, Clone, Serialize)]
pub struct GameSummary {
    pub game: GameKind,
    pub ticks: u64,
    pub stop: StopReason,
    pub fitness: FitnessStats,
}

/// Everything worth logging about one finished generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub generation: u64,
    pub games: Vec<GameSummary>,
    /// Statistics of the combined fitness the evolver ranked by.
    pub fitness: FitnessStats,
    pub genes: GeneStats,
    /// Whether the best agent replaced the stored checkpoint.
    pub checkpoint_saved: bool,
}

/// Owns a population and advances it one generation at a time.
#[derive(Debug)]
pub struct Trainer {
    harness: Harness,
    population: Population,
    evolver: PopulationEvolver,
    combination: FitnessCombination,
    limits: EpisodeLimits,
    checkpoint_path: Option<PathBuf>,
    generation: u64,
}

impl Trainer {
    /// Starts at generation 1.
    ///
    /// # Panics
    ///
    /// Panics if `population` uses a different architecture than `harness`.
    #[must_use]
    pub fn new(harness: Harness, population: Population, evolver: PopulationEvolver) -> Self {
        assert!(
            population.architecture().config() == harness.architecture().config(),
            "population must use the harness architecture"
        );
        Self {
            harness,
            population,
            evolver,
            combination: FitnessCombination::default(),
            limits: EpisodeLimits::default(),
            checkpoint_path: None,
            generation: 1,
        }
    }

    #[must_use]
    pub fn with_combination(mut self, combination: FitnessCombination) -> Self {
        self.combination = combination;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: EpisodeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Keeps the best agent ever seen at `path`.
    #[must_use]
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = Some(path.into());
        self
    }

    /// The generation the next [`run_generation`](Self::run_generation) evaluates.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Evaluates the population in every world, saves the best agent if it
    /// beats the checkpoint and replaces the population with the next
    /// generation.
    ///
    /// On error the population and generation counter are left unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `worlds` is empty, or on the preconditions of
    /// [`Harness::run_episode`].
    pub fn run_generation<R>(
        &mut self,
        worlds: &mut [&mut dyn GameWorld],
        rng: &mut R,
    ) -> Result<GenerationReport, TrainError>
    where
        R: Rng + ?Sized,
    {
        assert!(!worlds.is_empty(), "at least one game world is required");

        let mut games = Vec::with_capacity(worlds.len());
        let mut per_game = Vec::with_capacity(worlds.len());
        for world in worlds.iter_mut() {
            let outcome = self
                .harness
                .run_episode(&mut **world, &self.population, &self.limits)?;
            games.push(GameSummary {
                game: outcome.game,
                ticks: outcome.ticks,
                stop: outcome.stop,
                fitness: summarize(&outcome.fitness),
            });
            per_game.push(outcome.fitness);
        }

        let combined = self.combination.combine(&per_game);
        let fitness = summarize(&combined);
        let checkpoint_saved = match &self.checkpoint_path {
            Some(path) => {
                let best = &self.population.agents()[fitness.best_index];
                let record =
                    CheckpointRecord::from_agent(best, combined[fitness.best_index], self.generation);
                checkpoint::save_if_better(&record, path)?
            }
            None => false,
        };

        let genes = self.population.compute_gene_stats();
        self.population = self.evolver.evolve(&self.population, &combined, rng);
        let report = GenerationReport {
            generation: self.generation,
            games,
            fitness,
            genes,
            checkpoint_saved,
        };
        self.generation += 1;
        Ok(report)
    }
}

fn summarize(fitness: &[f32]) -> FitnessStats {
    FitnessStats::new(fitness).unwrap_or_else(|| panic!("population is never empty"))
}
