//! Network architecture descriptors and genome layout.
//!
//! An [`Architecture`] is the immutable, validated form of an
//! [`ArchitectureConfig`]. Building it computes every layer's offset into the
//! flat genome once, so decoding never has to walk the configuration again.
//!
//! # Genome Layout
//!
//! Genes are laid out layer by layer, weights before biases:
//!
//! ```text
//! trunk[0].weights | trunk[0].biases | ... | trunk[n].weights | trunk[n].biases
//!   | head[0].weights | head[0].biases | ... | head[m].weights | head[m].biases
//! ```
//!
//! Weights are row-major with one row per output neuron (`out_size × in_size`).
//!
//! # Example
//!
//! ```
//! use neuroarcade_network::architecture::ArchitectureConfig;
//!
//! let architecture = ArchitectureConfig::dual_game(5, 4).build().unwrap();
//! assert_eq!(architecture.input_size(), 7);
//! // (7 * 4 + 4) + (4 * 1 + 1) + (4 * 2 + 2)
//! assert_eq!(architecture.genome_size(), 47);
//! ```

use std::{collections::BTreeSet, ops::Range};

use serde::{Deserialize, Serialize};

/// Hidden units used by the presets when no width is given.
pub const DEFAULT_HIDDEN_UNITS: usize = 4;

/// Name of the Flappy head in [`ArchitectureConfig::dual_game`].
pub const FLAPPY_HEAD: &str = "flappy";
/// Name of the Dino head in [`ArchitectureConfig::dual_game`].
pub const DINO_HEAD: &str = "dino";
/// Output name of a jump decision.
pub const JUMP_OUTPUT: &str = "jump";
/// Output name of a duck decision.
pub const DUCK_OUTPUT: &str = "duck";

/// Which output heads are evaluated on a decision tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadSelection {
    /// Every head is evaluated on every tick.
    #[default]
    All,
    /// The last `heads.len()` inputs are a one-hot discriminator in head order.
    ///
    /// Only the first head whose flag is exactly `1.0` is evaluated. When no
    /// flag is set, no head is evaluated and every output is `false`.
    Discriminator,
}

/// Function applied to raw head outputs before thresholding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputActivation {
    /// Logistic sigmoid, mapping to (0, 1).
    #[default]
    Sigmoid,
    /// Raw affine output, thresholded directly.
    Identity,
}

/// A named output head and the names of its boolean outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadSpec {
    pub name: String,
    pub outputs: Vec<String>,
}

impl HeadSpec {
    pub fn new<N, I, O>(name: N, outputs: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = O>,
        O: Into<String>,
    {
        Self {
            name: name.into(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.outputs.len()
    }
}

/// Serializable architecture declaration.
///
/// `input_size` counts every input, including a discriminator suffix when
/// `head_selection` is [`HeadSelection::Discriminator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    pub input_size: usize,
    pub hidden_sizes: Vec<usize>,
    pub heads: Vec<HeadSpec>,
    #[serde(default)]
    pub head_selection: HeadSelection,
    #[serde(default)]
    pub output_activation: OutputActivation,
}

impl ArchitectureConfig {
    /// Shared-trunk network playing both games.
    ///
    /// Heads are `flappy: [jump]` and `dino: [jump, duck]`, selected by a
    /// two-input discriminator appended after `feature_count` game features.
    #[must_use]
    pub fn dual_game(feature_count: usize, hidden_units: usize) -> Self {
        Self {
            input_size: feature_count + 2,
            hidden_sizes: vec![hidden_units],
            heads: vec![
                HeadSpec::new(FLAPPY_HEAD, [JUMP_OUTPUT]),
                HeadSpec::new(DINO_HEAD, [JUMP_OUTPUT, DUCK_OUTPUT]),
            ],
            head_selection: HeadSelection::Discriminator,
            output_activation: OutputActivation::Sigmoid,
        }
    }

    /// Single-hidden-layer network with one head and no discriminator.
    #[must_use]
    pub fn single_head(input_size: usize, hidden_units: usize, head: HeadSpec) -> Self {
        Self {
            input_size,
            hidden_sizes: vec![hidden_units],
            heads: vec![head],
            head_selection: HeadSelection::All,
            output_activation: OutputActivation::Sigmoid,
        }
    }

    /// Validates the declaration and computes the genome layout.
    pub fn build(&self) -> Result<Architecture, ArchitectureError> {
        Architecture::new(self.clone())
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ArchitectureError {
    #[display("input size must be positive")]
    ZeroInputSize,
    #[display("at least one hidden layer is required")]
    NoHiddenLayers,
    #[display("hidden layer {index} has zero width")]
    ZeroWidthHidden { index: usize },
    #[display("at least one output head is required")]
    NoHeads,
    #[display("head '{name}' declares no outputs")]
    EmptyHead { name: String },
    #[display("head '{name}' is declared more than once")]
    DuplicateHead { name: String },
    #[display("head '{head}' declares output '{output}' more than once")]
    DuplicateOutput { head: String, output: String },
    #[display("discriminator needs {heads} inputs but the input size is {input_size}")]
    DiscriminatorTooWide { heads: usize, input_size: usize },
    #[display("layer sizes overflow the genome length")]
    TooLarge,
}

/// Position and shape of one fully connected layer inside a genome.
///
/// Only built by [`Architecture::new`], which checks that every range fits in
/// `usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerLayout {
    in_size: usize,
    out_size: usize,
    offset: usize,
}

impl LayerLayout {
    #[must_use]
    pub fn in_size(&self) -> usize {
        self.in_size
    }

    #[must_use]
    pub fn out_size(&self) -> usize {
        self.out_size
    }

    #[must_use]
    pub fn weight_count(&self) -> usize {
        self.in_size * self.out_size
    }

    #[must_use]
    pub fn gene_count(&self) -> usize {
        self.weight_count() + self.out_size
    }

    /// Genome indices of the row-major weight matrix.
    #[must_use]
    pub fn weight_range(&self) -> Range<usize> {
        self.offset..self.offset + self.weight_count()
    }

    /// Genome indices of the bias vector.
    #[must_use]
    pub fn bias_range(&self) -> Range<usize> {
        let start = self.offset + self.weight_count();
        start..start + self.out_size
    }
}

/// Handle to one named boolean output, resolved once from names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputSlot {
    head: usize,
    index: usize,
}

impl OutputSlot {
    /// Index of the head this output belongs to.
    #[must_use]
    pub fn head(&self) -> usize {
        self.head
    }

    /// Position of the output in a flattened decision (all heads in order).
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Validated, immutable network architecture with precomputed layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Architecture {
    config: ArchitectureConfig,
    trunk: Vec<LayerLayout>,
    heads: Vec<LayerLayout>,
    output_offsets: Vec<usize>,
    output_count: usize,
    genome_size: usize,
}

impl Architecture {
    pub fn new(config: ArchitectureConfig) -> Result<Self, ArchitectureError> {
        validate(&config)?;

        let mut offset = 0;
        let mut push_layer =
            |in_size: usize, out_size: usize| -> Result<LayerLayout, ArchitectureError> {
                let layer = LayerLayout {
                    in_size,
                    out_size,
                    offset,
                };
                offset = in_size
                    .checked_mul(out_size)
                    .and_then(|weights| weights.checked_add(out_size))
                    .and_then(|genes| genes.checked_add(offset))
                    .ok_or(ArchitectureError::TooLarge)?;
                Ok(layer)
            };

        let mut in_size = config.input_size;
        let mut trunk = Vec::with_capacity(config.hidden_sizes.len());
        for &out_size in &config.hidden_sizes {
            trunk.push(push_layer(in_size, out_size)?);
            in_size = out_size;
        }
        let heads = config
            .heads
            .iter()
            .map(|head| push_layer(in_size, head.width()))
            .collect::<Result<Vec<_>, _>>()?;
        let genome_size = offset;

        let mut output_offsets = Vec::with_capacity(heads.len());
        let mut output_count = 0;
        for head in &heads {
            output_offsets.push(output_count);
            output_count += head.out_size;
        }

        Ok(Self {
            config,
            trunk,
            heads,
            output_offsets,
            output_count,
            genome_size,
        })
    }

    #[must_use]
    pub fn config(&self) -> &ArchitectureConfig {
        &self.config
    }

    #[must_use]
    pub fn input_size(&self) -> usize {
        self.config.input_size
    }

    #[must_use]
    pub fn hidden_sizes(&self) -> &[usize] {
        &self.config.hidden_sizes
    }

    #[must_use]
    pub fn head_specs(&self) -> &[HeadSpec] {
        &self.config.heads
    }

    #[must_use]
    pub fn head_count(&self) -> usize {
        self.config.heads.len()
    }

    #[must_use]
    pub fn head_selection(&self) -> HeadSelection {
        self.config.head_selection
    }

    #[must_use]
    pub fn output_activation(&self) -> OutputActivation {
        self.config.output_activation
    }

    /// Number of genes a genome for this architecture must hold.
    #[must_use]
    pub fn genome_size(&self) -> usize {
        self.genome_size
    }

    /// Total number of boolean outputs across all heads.
    #[must_use]
    pub fn output_count(&self) -> usize {
        self.output_count
    }

    #[must_use]
    pub fn trunk_layers(&self) -> &[LayerLayout] {
        &self.trunk
    }

    #[must_use]
    pub fn head_layers(&self) -> &[LayerLayout] {
        &self.heads
    }

    /// All layers in genome order: trunk first, then heads.
    pub fn layers(&self) -> impl Iterator<Item = &LayerLayout> {
        self.trunk.iter().chain(&self.heads)
    }

    #[must_use]
    pub fn head_index(&self, name: &str) -> Option<usize> {
        self.config.heads.iter().position(|head| head.name == name)
    }

    /// Range of a head's outputs within a flattened decision.
    #[must_use]
    pub fn head_output_range(&self, head: usize) -> Range<usize> {
        let start = self.output_offsets[head];
        start..start + self.heads[head].out_size
    }

    #[must_use]
    pub fn output_slot(&self, head: &str, output: &str) -> Option<OutputSlot> {
        let head_index = self.head_index(head)?;
        let position = self.config.heads[head_index]
            .outputs
            .iter()
            .position(|name| name == output)?;
        Some(OutputSlot {
            head: head_index,
            index: self.output_offsets[head_index] + position,
        })
    }

    /// Input indices holding the one-hot head discriminator, if any.
    #[must_use]
    pub fn discriminator_range(&self) -> Option<Range<usize>> {
        match self.config.head_selection {
            HeadSelection::All => None,
            HeadSelection::Discriminator => {
                let input_size = self.config.input_size;
                Some(input_size - self.head_count()..input_size)
            }
        }
    }

    /// Number of inputs that carry game features (excluding the discriminator).
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.discriminator_range()
            .map_or(self.input_size(), |range| range.start)
    }
}

fn validate(config: &ArchitectureConfig) -> Result<(), ArchitectureError> {
    if config.input_size == 0 {
        return Err(ArchitectureError::ZeroInputSize);
    }
    if config.hidden_sizes.is_empty() {
        return Err(ArchitectureError::NoHiddenLayers);
    }
    if let Some(index) = config.hidden_sizes.iter().position(|&size| size == 0) {
        return Err(ArchitectureError::ZeroWidthHidden { index });
    }
    if config.heads.is_empty() {
        return Err(ArchitectureError::NoHeads);
    }

    let mut head_names = BTreeSet::new();
    for head in &config.heads {
        if head.outputs.is_empty() {
            return Err(ArchitectureError::EmptyHead {
                name: head.name.clone(),
            });
        }
        if !head_names.insert(head.name.as_str()) {
            return Err(ArchitectureError::DuplicateHead {
                name: head.name.clone(),
            });
        }
        let mut output_names = BTreeSet::new();
        for output in &head.outputs {
            if !output_names.insert(output.as_str()) {
                return Err(ArchitectureError::DuplicateOutput {
                    head: head.name.clone(),
                    output: output.clone(),
                });
            }
        }
    }

    if config.head_selection == HeadSelection::Discriminator
        && config.heads.len() > config.input_size
    {
        return Err(ArchitectureError::DiscriminatorTooWide {
            heads: config.heads.len(),
            input_size: config.input_size,
        });
    }

    Ok(())
}
