//! Agents: a genome paired with the architecture that interprets it.

use std::sync::Arc;

use neuroarcade_network::{
    ActivationTrace, Architecture, Decision, DecodedNetwork, Genome, InvalidGenomeLength, decode,
};
use rand::Rng;

use crate::genes;

/// Per-gene mutation probability used when none is configured.
pub const DEFAULT_MUTATION_RATE: f32 = 0.05;
/// Maximum per-gene perturbation used when none is configured.
pub const DEFAULT_MUTATION_STRENGTH: f32 = 0.5;

/// A single network-controlled player.
///
/// The agent owns its genome and shares the architecture with the rest of
/// its population.
#[derive(Debug, Clone)]
pub struct Agent {
    architecture: Arc<Architecture>,
    genome: Genome,
}

impl Agent {
    /// Creates an agent with genes sampled uniformly from `[-1, 1]`.
    pub fn random<R>(architecture: Arc<Architecture>, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let genome = Genome::from_fn(&architecture, |_| genes::random_gene(rng));
        Self {
            architecture,
            genome,
        }
    }

    /// Recreates an agent from stored genes, e.g. a checkpoint.
    pub fn from_genes(
        architecture: Arc<Architecture>,
        genes: Vec<f32>,
    ) -> Result<Self, InvalidGenomeLength> {
        let genome = Genome::new(&architecture, genes)?;
        Ok(Self {
            architecture,
            genome,
        })
    }

    /// Pairs an existing genome with `architecture`.
    ///
    /// # Panics
    ///
    /// Panics if the genome was built for a different genome size.
    #[must_use]
    pub fn with_genome(architecture: Arc<Architecture>, genome: Genome) -> Self {
        assert_eq!(
            genome.len(),
            architecture.genome_size(),
            "genome length must match the architecture"
        );
        Self {
            architecture,
            genome,
        }
    }

    #[must_use]
    pub fn architecture(&self) -> &Arc<Architecture> {
        &self.architecture
    }

    #[must_use]
    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    #[must_use]
    pub fn network(&self) -> DecodedNetwork<'_> {
        decode(&self.architecture, self.genome.genes())
    }

    /// Runs the network on one tick's features.
    ///
    /// # Panics
    ///
    /// Panics if `features.len()` differs from the architecture's input size.
    #[must_use]
    pub fn decide(&self, features: &[f32]) -> Decision {
        self.network().decide(features)
    }

    /// Same decision as [`decide`](Self::decide), plus every layer's activations.
    #[must_use]
    pub fn decide_with_activations(&self, features: &[f32]) -> (Decision, ActivationTrace<'_>) {
        self.network().decide_traced(features)
    }

    /// Returns a child with an independently mutated copy of this genome.
    ///
    /// See [`genes::mutate`] for the per-gene rule.
    #[must_use]
    pub fn clone_with_mutation<R>(&self, rate: f32, strength: f32, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut genome = self.genome.clone();
        genes::mutate(genome.genes_mut(), rate, strength, rng);
        Self {
            architecture: Arc::clone(&self.architecture),
            genome,
        }
    }
}
