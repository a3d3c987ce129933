//! Generational evolution by elitism and mutation.
//!
//! Each generation keeps the best-ranked agents unchanged and refills the
//! rest of the population with mutated clones of them.
//!
//! # Algorithm
//!
//! 1. **Rank** - Agent indices are sorted by fitness, best first. The sort is
//!    stable, so equal fitness keeps the original index order
//! 2. **Retain** - The top `max(1, floor(size * retain_top))` agents are the elites
//!    and are copied into the next generation as they are
//! 3. **Refill** - Until the population is full again, an elite is drawn
//!    uniformly (with replacement) and a mutated clone of it is appended
//!
//! There is no crossover and no fitness-proportionate selection. Selection
//! pressure comes entirely from `retain_top`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use neuroarcade_network::ArchitectureConfig;
//! use neuroarcade_training::genetic::{Population, PopulationEvolver};
//!
//! let architecture = Arc::new(ArchitectureConfig::dual_game(5, 4).build().unwrap());
//! let mut rng = rand::rng();
//! let population = Population::random(&architecture, 20, &mut rng);
//!
//! let fitness = (0..20).map(|i| i as f32).collect::<Vec<_>>();
//! let next = PopulationEvolver::default().evolve(&population, &fitness, &mut rng);
//! assert_eq!(next.len(), 20);
//! assert_eq!(next.agents()[0].genome(), population.agents()[19].genome());
//! ```

use std::sync::Arc;

use neuroarcade_network::Architecture;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    agent::{Agent, DEFAULT_MUTATION_RATE, DEFAULT_MUTATION_STRENGTH},
    stats::GeneStats,
};

/// Fraction of the population kept as elites when none is configured.
pub const DEFAULT_RETAIN_TOP: f64 = 0.1;

/// A non-empty, fixed-size group of agents sharing one architecture.
#[derive(Debug, Clone)]
pub struct Population {
    agents: Vec<Agent>,
}

impl Population {
    /// Creates `count` agents with freshly sampled genomes.
    ///
    /// # Panics
    ///
    /// Panics if `count` is zero.
    pub fn random<R>(architecture: &Arc<Architecture>, count: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        assert!(count > 0, "population must not be empty");
        let agents = (0..count)
            .map(|_| Agent::random(Arc::clone(architecture), rng))
            .collect();
        Self { agents }
    }

    /// Wraps existing agents, e.g. a population seeded from a checkpoint.
    ///
    /// # Panics
    ///
    /// Panics if `agents` is empty or the agents do not all share the same
    /// architecture.
    #[must_use]
    pub fn from_agents(agents: Vec<Agent>) -> Self {
        assert!(!agents.is_empty(), "population must not be empty");
        let first = agents[0].architecture();
        assert!(
            agents
                .iter()
                .all(|agent| Arc::ptr_eq(agent.architecture(), first)
                    || agent.architecture().config() == first.config()),
            "all agents in a population must share one architecture"
        );
        Self { agents }
    }

    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Always `false`; provided alongside [`len`](Self::len).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[must_use]
    pub fn architecture(&self) -> &Arc<Architecture> {
        self.agents[0].architecture()
    }

    #[must_use]
    pub fn into_agents(self) -> Vec<Agent> {
        self.agents
    }

    /// Summarizes every gene of every agent.
    ///
    /// Useful for watching genes drift outside the initialization range
    /// over many generations.
    #[must_use]
    pub fn compute_gene_stats(&self) -> GeneStats {
        GeneStats::new(
            self.agents
                .iter()
                .flat_map(|agent| agent.genome().genes().iter().copied()),
        )
        .unwrap_or_default()
    }
}

/// Invalid evolution parameters.
#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
pub enum EvolverConfigError {
    #[display("retain_top must be within (0, 1], got {value}")]
    RetainTopOutOfRange { value: f64 },
    #[display("mutation_rate must be within [0, 1], got {value}")]
    MutationRateOutOfRange { value: f32 },
    #[display("mutation_strength must be positive and finite, got {value}")]
    InvalidMutationStrength { value: f32 },
}

/// Parameters of one elitism + mutation step.
///
/// Missing fields take their defaults when deserialized, so a configuration
/// file only needs to name what it changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationEvolver {
    /// Fraction of the population retained as elites, in `(0, 1]`
    pub retain_top: f64,
    /// Per-gene mutation probability, in `[0, 1]`
    pub mutation_rate: f32,
    /// Maximum absolute perturbation applied to a mutated gene
    pub mutation_strength: f32,
}

impl Default for PopulationEvolver {
    fn default() -> Self {
        Self {
            retain_top: DEFAULT_RETAIN_TOP,
            mutation_rate: DEFAULT_MUTATION_RATE,
            mutation_strength: DEFAULT_MUTATION_STRENGTH,
        }
    }
}

impl PopulationEvolver {
    /// Checks the parameters, typically right after loading a configuration.
    pub fn validate(&self) -> Result<(), EvolverConfigError> {
        if !(self.retain_top > 0.0 && self.retain_top <= 1.0) {
            return Err(EvolverConfigError::RetainTopOutOfRange {
                value: self.retain_top,
            });
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(EvolverConfigError::MutationRateOutOfRange {
                value: self.mutation_rate,
            });
        }
        if !(self.mutation_strength > 0.0 && self.mutation_strength.is_finite()) {
            return Err(EvolverConfigError::InvalidMutationStrength {
                value: self.mutation_strength,
            });
        }
        Ok(())
    }

    /// Number of elites kept from a population of `population_size`.
    ///
    /// Never less than one, never more than the population.
    #[expect(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    #[must_use]
    pub fn retain_count(&self, population_size: usize) -> usize {
        let retained = (population_size as f64 * self.retain_top).floor() as usize;
        retained.clamp(1, population_size.max(1))
    }

    /// Produces the next generation.
    ///
    /// `fitness[i]` is the score of `population.agents()[i]`. The result has
    /// the same size as `population`; its first `retain_count` agents are the
    /// elites in rank order, followed by mutated clones.
    ///
    /// # Panics
    ///
    /// Panics if `fitness` and `population` differ in length, if any fitness
    /// is NaN, or if the parameters fail [`validate`](Self::validate).
    pub fn evolve<R>(&self, population: &Population, fitness: &[f32], rng: &mut R) -> Population
    where
        R: Rng + ?Sized,
    {
        if let Err(err) = self.validate() {
            panic!("{err}");
        }
        assert_eq!(
            population.len(),
            fitness.len(),
            "fitness must hold exactly one score per agent"
        );
        assert!(
            !fitness.iter().any(|f| f.is_nan()),
            "fitness must not contain NaN"
        );

        let size = population.len();
        let ranking = rank_by_fitness(fitness);
        let elites = ranking[..self.retain_count(size)]
            .iter()
            .map(|&index| &population.agents[index])
            .collect::<Vec<_>>();

        let mut agents = Vec::with_capacity(size);
        agents.extend(elites.iter().map(|&elite| elite.clone()));
        while agents.len() < size {
            let parent = elites[rng.random_range(0..elites.len())];
            agents.push(parent.clone_with_mutation(
                self.mutation_rate,
                self.mutation_strength,
                rng,
            ));
        }

        Population { agents }
    }
}

/// Returns agent indices ordered by fitness, highest first.
///
/// Equal scores keep their original relative order.
///
/// # Examples
///
/// ```
/// use neuroarcade_training::genetic::rank_by_fitness;
///
/// assert_eq!(rank_by_fitness(&[1.0, 5.0, 3.0, 5.0]), vec![1, 3, 2, 0]);
/// ```
#[must_use]
pub fn rank_by_fitness(fitness: &[f32]) -> Vec<usize> {
    let mut indices = (0..fitness.len()).collect::<Vec<_>>();
    indices.sort_by(|&a, &b| fitness[b].total_cmp(&fitness[a]));
    indices
}
