//! Flat genomes and their decoding into layer views.
//!
//! Decoding does not copy: a [`DecodedNetwork`] borrows the genome and hands
//! out [`LayerView`]s that slice it at offsets fixed by the [`Architecture`].
//! Decoding the same genome twice therefore yields bit-identical matrices.

use crate::architecture::{Architecture, LayerLayout};

/// A genome whose length does not match the architecture it is paired with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("genome has {actual} genes but the architecture requires {expected}")]
pub struct InvalidGenomeLength {
    pub expected: usize,
    pub actual: usize,
}

/// Fixed-length vector of unconstrained real genes.
///
/// A `Genome` can only be created with the length its architecture requires.
/// Genes are never clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct Genome {
    genes: Vec<f32>,
}

impl Genome {
    pub fn new(architecture: &Architecture, genes: Vec<f32>) -> Result<Self, InvalidGenomeLength> {
        check_length(architecture, &genes)?;
        Ok(Self { genes })
    }

    #[must_use]
    pub fn zeros(architecture: &Architecture) -> Self {
        Self {
            genes: vec![0.0; architecture.genome_size()],
        }
    }

    /// Builds a genome by evaluating `f` at every gene index.
    pub fn from_fn<F>(architecture: &Architecture, f: F) -> Self
    where
        F: FnMut(usize) -> f32,
    {
        Self {
            genes: (0..architecture.genome_size()).map(f).collect(),
        }
    }

    #[must_use]
    pub fn genes(&self) -> &[f32] {
        &self.genes
    }

    /// Mutable access to the genes. The length cannot change through it.
    pub fn genes_mut(&mut self) -> &mut [f32] {
        &mut self.genes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    #[must_use]
    pub fn into_genes(self) -> Vec<f32> {
        self.genes
    }
}

fn check_length(architecture: &Architecture, genes: &[f32]) -> Result<(), InvalidGenomeLength> {
    let expected = architecture.genome_size();
    if genes.len() == expected {
        Ok(())
    } else {
        Err(InvalidGenomeLength {
            expected,
            actual: genes.len(),
        })
    }
}

/// Borrowed weights and biases of one layer.
#[derive(Debug, Clone, Copy)]
pub struct LayerView<'a> {
    layout: LayerLayout,
    weights: &'a [f32],
    biases: &'a [f32],
}

impl<'a> LayerView<'a> {
    fn new(layout: LayerLayout, genes: &'a [f32]) -> Self {
        Self {
            layout,
            weights: &genes[layout.weight_range()],
            biases: &genes[layout.bias_range()],
        }
    }

    #[must_use]
    pub fn in_size(&self) -> usize {
        self.layout.in_size()
    }

    #[must_use]
    pub fn out_size(&self) -> usize {
        self.layout.out_size()
    }

    /// Row-major `out_size × in_size` weight matrix.
    #[must_use]
    pub fn weights(&self) -> &'a [f32] {
        self.weights
    }

    #[must_use]
    pub fn biases(&self) -> &'a [f32] {
        self.biases
    }

    /// Incoming weights of output neuron `neuron`.
    #[must_use]
    pub fn row(&self, neuron: usize) -> &'a [f32] {
        let in_size = self.in_size();
        &self.weights[neuron * in_size..(neuron + 1) * in_size]
    }

    /// Weight from input `input` to output neuron `neuron`.
    #[must_use]
    pub fn weight(&self, neuron: usize, input: usize) -> f32 {
        self.row(neuron)[input]
    }

    /// Writes `W · input + b` into `out`, replacing its contents.
    pub(crate) fn affine_into(&self, input: &[f32], out: &mut Vec<f32>) {
        debug_assert_eq!(input.len(), self.in_size());
        out.clear();
        out.extend(
            self.weights
                .chunks_exact(self.in_size())
                .zip(self.biases)
                .map(|(row, bias)| {
                    row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + bias
                }),
        );
    }
}

/// A genome viewed through its architecture.
#[derive(Debug, Clone, Copy)]
pub struct DecodedNetwork<'a> {
    architecture: &'a Architecture,
    genes: &'a [f32],
}

/// Pairs `genes` with `architecture`.
///
/// # Panics
///
/// Panics if the genome length differs from [`Architecture::genome_size`];
/// such a pairing is a programming error.
#[must_use]
pub fn decode<'a>(architecture: &'a Architecture, genes: &'a [f32]) -> DecodedNetwork<'a> {
    if let Err(err) = check_length(architecture, genes) {
        panic!("{err}");
    }
    DecodedNetwork {
        architecture,
        genes,
    }
}

impl<'a> DecodedNetwork<'a> {
    #[must_use]
    pub fn architecture(&self) -> &'a Architecture {
        self.architecture
    }

    #[must_use]
    pub fn trunk_layer(&self, index: usize) -> LayerView<'a> {
        LayerView::new(self.architecture.trunk_layers()[index], self.genes)
    }

    #[must_use]
    pub fn head_layer(&self, index: usize) -> LayerView<'a> {
        LayerView::new(self.architecture.head_layers()[index], self.genes)
    }

    pub fn trunk_layers(&self) -> impl Iterator<Item = LayerView<'a>> + use<'a> {
        let genes = self.genes;
        self.architecture
            .trunk_layers()
            .iter()
            .map(move |&layout| LayerView::new(layout, genes))
    }

    pub fn head_layers(&self) -> impl Iterator<Item = LayerView<'a>> + use<'a> {
        let genes = self.genes;
        self.architecture
            .head_layers()
            .iter()
            .map(move |&layout| LayerView::new(layout, genes))
    }
}
