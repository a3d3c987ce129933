//! Neuroevolution of fixed-topology network agents.
//!
//! Agents carry a genome for a shared [`Architecture`](neuroarcade_network::Architecture).
//! A generation is scored by some external harness; this crate then keeps the
//! best agents, refills the population with their mutated clones and keeps the
//! single best agent ever seen on disk.
//!
//! # How Training Works
//!
//! 1. **Population** - [`Population::random`](genetic::Population::random) samples genes uniformly from `[-1, 1]`
//! 2. **Evaluation** - The caller plays every agent and produces one fitness per agent
//! 3. **Checkpoint** - [`checkpoint::save_if_better`] persists the best agent if it beats the stored one
//! 4. **Evolution** - [`PopulationEvolver::evolve`](genetic::PopulationEvolver::evolve) keeps elites and refills with mutated clones
//! 5. **Repeat** - The population size never changes between generations
//!
//! # Modules
//!
//! - [`agent`] - A genome bound to its architecture, with decision and mutation
//! - [`genes`] - Gene sampling and per-gene uniform mutation
//! - [`genetic`] - Population, ranking and the elitism + mutation step
//! - [`stats`] - Fitness and gene-magnitude summaries for progress reports
//! - [`checkpoint`] - JSON persistence of the best `(genome, fitness, generation)`
//!
//! # Randomness
//!
//! Every stochastic operation takes `&mut R where R: Rng + ?Sized`, so runs are
//! reproducible with a seeded generator such as `rand_pcg::Pcg32`.

pub mod agent;
pub mod checkpoint;
pub mod genes;
pub mod genetic;
pub mod stats;
