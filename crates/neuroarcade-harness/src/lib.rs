//! Evaluation harness connecting network agents to arcade games.
//!
//! Game physics live elsewhere, behind the [`GameWorld`](world::GameWorld)
//! trait. This crate turns a world's observations into network inputs, the
//! agents' decisions into game actions, and a population's episodes into
//! fitness scores for evolution.
//!
//! # Architecture
//!
//! ```text
//! GameWorld (external)
//!     ↓ Observation per live agent
//! features      normalize into FEATURE_COUNT values
//!     ↓ + one-hot discriminator
//! Agent::decide (parallel within a tick)
//!     ↓ Decision
//! GameAction    applied back to the world
//!     ↓ ... until every agent is terminal or a limit is hit
//! EpisodeOutcome per game
//!     ↓ FitnessCombination
//! Trainer       checkpoint + evolve
//!     ↓ one per configuration
//! ExperimentSet settings compared side by side
//! ```
//!
//! # Modules
//!
//! - [`features`] - Observations and their normalization
//! - [`world`] - Game kinds, actions and the [`GameWorld`](world::GameWorld) trait
//! - [`episode`] - The per-tick episode driver
//! - [`fitness`] - Combining per-game fitness
//! - [`trainer`] - The generation loop
//! - [`experiment`] - Several evolution settings trained side by side

pub mod episode;
pub mod experiment;
pub mod features;
pub mod fitness;
pub mod trainer;
pub mod world;
