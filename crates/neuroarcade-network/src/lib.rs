//! Fixed-topology feedforward networks encoded as flat genomes.
//!
//! This crate is the part of the system that turns a vector of genes into
//! decisions. It knows nothing about games or evolution.
//!
//! # Modules
//!
//! - [`architecture`] - Layer sizes, named output heads and the genome layout they imply
//! - [`genome`] - Length-checked genomes and zero-copy decoding into layer views
//! - [`forward`] - Forward propagation, thresholded decisions and activation traces
//!
//! # Network Shape
//!
//! ```text
//! input ─▶ tanh(W₁·x + b₁) ─▶ ... ─▶ tanh(Wₙ·h + bₙ) ─┬─▶ head 0: σ(W·h + b) > 0.5
//!                                                    └─▶ head 1: σ(W·h + b) > 0.5
//! ```
//!
//! Heads share the hidden trunk. With [`HeadSelection::Discriminator`], a one-hot
//! suffix of the input picks the single head evaluated on a tick; the other heads'
//! weights are not touched.
//!
//! # Example
//!
//! ```
//! use neuroarcade_network::{
//!     ArchitectureConfig, Genome, HeadSpec, decode,
//! };
//!
//! let architecture = ArchitectureConfig::single_head(5, 4, HeadSpec::new("dino", ["jump", "duck"]))
//!     .build()
//!     .unwrap();
//! let genome = Genome::zeros(&architecture);
//! let decision = decode(&architecture, genome.genes()).decide(&[0.1, -0.2, 0.5, 0.0, 0.9]);
//!
//! // sigmoid(0) is exactly 0.5, which does not fire.
//! assert_eq!(decision.as_slice(), &[false, false]);
//! ```

pub use self::{
    architecture::{
        Architecture, ArchitectureConfig, ArchitectureError, HeadSelection, HeadSpec,
        LayerLayout, OutputActivation, OutputSlot,
    },
    forward::{ActivationTrace, Decision, HeadActivation, LayerActivation, fires, sigmoid},
    genome::{DecodedNetwork, Genome, InvalidGenomeLength, LayerView, decode},
};

pub mod architecture;
pub mod forward;
pub mod genome;
