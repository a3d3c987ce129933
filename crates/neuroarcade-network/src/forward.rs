//! Forward propagation and decisions.
//!
//! Hidden layers use `tanh`, keeping every activation in (-1, 1) however far
//! the genes drift. Head outputs go through the architecture's
//! [`OutputActivation`] and are thresholded with [`fires`].
//!
//! [`DecodedNetwork::decide`] and [`DecodedNetwork::decide_traced`] run the
//! same pass; the traced variant only records what the pass computed.

use std::ops::Range;

use crate::{
    architecture::{OutputActivation, OutputSlot},
    genome::{DecodedNetwork, LayerView},
};

/// Activated outputs strictly above this value fire.
pub const DECISION_THRESHOLD: f32 = 0.5;

/// Returns whether an activated output counts as `true`.
///
/// The comparison is strict: exactly `0.5` is `false`.
#[must_use]
pub fn fires(value: f32) -> bool {
    value > DECISION_THRESHOLD
}

#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl OutputActivation {
    #[must_use]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            OutputActivation::Sigmoid => sigmoid(x),
            OutputActivation::Identity => x,
        }
    }
}

/// Boolean outputs of all heads, flattened in head order.
///
/// Outputs of heads that were not evaluated are `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    fired: Vec<bool>,
}

impl Decision {
    #[must_use]
    pub fn fired(&self, slot: OutputSlot) -> bool {
        self.fired[slot.index()]
    }

    #[must_use]
    pub fn as_slice(&self) -> &[bool] {
        &self.fired
    }

    #[must_use]
    pub fn any(&self) -> bool {
        self.fired.iter().any(|&f| f)
    }
}

/// Values produced by one layer together with the weights that produced them.
#[derive(Debug, Clone)]
pub struct LayerActivation<'a> {
    pub weights: LayerView<'a>,
    pub values: Vec<f32>,
}

/// Activated outputs of one evaluated head.
#[derive(Debug, Clone)]
pub struct HeadActivation<'a> {
    pub head: usize,
    pub layer: LayerActivation<'a>,
}

/// Side-channel record of a forward pass, for visualization.
#[derive(Debug, Clone, Default)]
pub struct ActivationTrace<'a> {
    pub input: Vec<f32>,
    pub hidden: Vec<LayerActivation<'a>>,
    pub heads: Vec<HeadActivation<'a>>,
}

impl<'a> DecodedNetwork<'a> {
    /// Runs the network on `features`.
    ///
    /// # Panics
    ///
    /// Panics if `features.len()` differs from the architecture's input size.
    #[must_use]
    pub fn decide(&self, features: &[f32]) -> Decision {
        self.forward(features, None)
    }

    /// Like [`decide`](Self::decide), also returning every activation.
    #[must_use]
    pub fn decide_traced(&self, features: &[f32]) -> (Decision, ActivationTrace<'a>) {
        let mut trace = ActivationTrace::default();
        let decision = self.forward(features, Some(&mut trace));
        (decision, trace)
    }

    /// Heads to evaluate for this input.
    #[must_use]
    pub fn selected_heads(&self, features: &[f32]) -> Range<usize> {
        let architecture = self.architecture();
        match architecture.discriminator_range() {
            None => 0..architecture.head_count(),
            Some(range) => {
                #[allow(clippy::float_cmp)]
                let active = features[range].iter().position(|&flag| flag == 1.0);
                active.map_or(0..0, |head| head..head + 1)
            }
        }
    }

    fn forward(&self, features: &[f32], mut trace: Option<&mut ActivationTrace<'a>>) -> Decision {
        let architecture = self.architecture();
        assert_eq!(
            features.len(),
            architecture.input_size(),
            "feature vector length must match the architecture input size"
        );
        if let Some(trace) = trace.as_deref_mut() {
            trace.input = features.to_vec();
        }

        let mut hidden = Vec::new();
        let mut next = Vec::new();
        for (index, layer) in self.trunk_layers().enumerate() {
            let input: &[f32] = if index == 0 { features } else { &hidden };
            layer.affine_into(input, &mut next);
            for value in &mut next {
                *value = value.tanh();
            }
            if let Some(trace) = trace.as_deref_mut() {
                trace.hidden.push(LayerActivation {
                    weights: layer,
                    values: next.clone(),
                });
            }
            std::mem::swap(&mut hidden, &mut next);
        }

        let activation = architecture.output_activation();
        let mut fired = vec![false; architecture.output_count()];
        let mut output = Vec::new();
        for head in self.selected_heads(features) {
            let layer = self.head_layer(head);
            layer.affine_into(&hidden, &mut output);
            let slots = &mut fired[architecture.head_output_range(head)];
            for (slot, value) in slots.iter_mut().zip(&mut output) {
                *value = activation.apply(*value);
                *slot = fires(*value);
            }
            if let Some(trace) = trace.as_deref_mut() {
                trace.heads.push(HeadActivation {
                    head,
                    layer: LayerActivation {
                        weights: layer,
                        values: output.clone(),
                    },
                });
            }
        }

        Decision { fired }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        architecture::{
            Architecture, ArchitectureConfig, DINO_HEAD, DUCK_OUTPUT, FLAPPY_HEAD, HeadSpec,
            JUMP_OUTPUT,
        },
        genome::{Genome, decode},
    };

    fn jump_duck() -> Architecture {
        ArchitectureConfig::single_head(5, 4, HeadSpec::new(DINO_HEAD, [JUMP_OUTPUT, DUCK_OUTPUT]))
            .build()
            .unwrap()
    }

    fn with_head_biases(architecture: &Architecture, head: usize, biases: &[f32]) -> Genome {
        let mut genome = Genome::zeros(architecture);
        let range = architecture.head_layers()[head].bias_range();
        genome.genes_mut()[range].copy_from_slice(biases);
        genome
    }

    const FEATURES: [f32; 5] = [0.1, -0.2, 0.5, 0.0, 0.9];

    mod threshold {
        use super::*;

        #[test]
        fn test_exactly_half_does_not_fire() {
            assert!(!fires(0.5));
            assert!(fires(0.5 + f32::EPSILON));
            assert!(!fires(0.5 - f32::EPSILON));
        }

        #[test]
        fn test_sigmoid_of_zero_is_exactly_half() {
            assert_eq!(sigmoid(0.0), 0.5);
        }

        #[test]
        fn test_identity_output_on_the_boundary() {
            let mut config = ArchitectureConfig::single_head(1, 1, HeadSpec::new("h", ["o"]));
            config.output_activation = OutputActivation::Identity;
            let architecture = config.build().unwrap();
            let slot = architecture.output_slot("h", "o").unwrap();

            let genome = with_head_biases(&architecture, 0, &[0.5]);
            let network = decode(&architecture, genome.genes());
            assert!(!network.decide(&[0.3]).fired(slot));

            let genome = with_head_biases(&architecture, 0, &[0.5 + f32::EPSILON]);
            let network = decode(&architecture, genome.genes());
            assert!(network.decide(&[0.3]).fired(slot));
        }
    }

    mod decide {
        use super::*;

        #[test]
        fn test_positive_logits_fire_both_outputs() {
            let architecture = jump_duck();
            let genome = with_head_biases(&architecture, 0, &[1.0, 2.0]);
            let decision = decode(&architecture, genome.genes()).decide(&FEATURES);
            assert_eq!(decision.as_slice(), &[true, true]);
        }

        #[test]
        fn test_all_zero_genome_fires_nothing() {
            let architecture = jump_duck();
            let genome = Genome::zeros(&architecture);
            let decision = decode(&architecture, genome.genes()).decide(&FEATURES);
            assert_eq!(decision.as_slice(), &[false, false]);
            assert!(!decision.any());
        }

        #[test]
        fn test_mixed_logits() {
            let architecture = jump_duck();
            let genome = with_head_biases(&architecture, 0, &[-0.1, 0.1]);
            let decision = decode(&architecture, genome.genes()).decide(&FEATURES);
            let jump = architecture.output_slot(DINO_HEAD, JUMP_OUTPUT).unwrap();
            let duck = architecture.output_slot(DINO_HEAD, DUCK_OUTPUT).unwrap();
            assert!(!decision.fired(jump));
            assert!(decision.fired(duck));
        }

        #[test]
        fn test_hidden_layer_feeds_heads() {
            let architecture = jump_duck();
            let mut genome = Genome::zeros(&architecture);
            let hidden = architecture.trunk_layers()[0];
            let head = architecture.head_layers()[0];
            // hidden[0] = tanh(features[4]) > 0, jump weight on hidden[0] positive,
            // duck weight on hidden[0] negative.
            genome.genes_mut()[hidden.weight_range().start + 4] = 1.0;
            genome.genes_mut()[head.weight_range().start] = 3.0;
            genome.genes_mut()[head.weight_range().start + 4] = -3.0;
            let decision = decode(&architecture, genome.genes()).decide(&FEATURES);
            assert_eq!(decision.as_slice(), &[true, false]);
        }

        #[test]
        fn test_same_inputs_same_decision() {
            let architecture = jump_duck();
            #[expect(clippy::cast_precision_loss)]
            let genome = Genome::from_fn(&architecture, |i| ((i * 37 % 11) as f32 - 5.0) / 5.0);
            let network = decode(&architecture, genome.genes());
            assert_eq!(network.decide(&FEATURES), network.decide(&FEATURES));
        }

        #[test]
        fn test_tolerates_extreme_finite_inputs() {
            let architecture = jump_duck();
            let genome = Genome::from_fn(&architecture, |_| 1.0);
            let network = decode(&architecture, genome.genes());
            let _ = network.decide(&[f32::MAX, f32::MIN, 1e30, -1e30, 0.0]);
        }

        #[test]
        #[should_panic(expected = "feature vector length")]
        fn test_rejects_wrong_feature_count() {
            let architecture = jump_duck();
            let genome = Genome::zeros(&architecture);
            let _ = decode(&architecture, genome.genes()).decide(&[0.0; 4]);
        }
    }

    mod discriminator {
        use super::*;

        fn dual() -> Architecture {
            ArchitectureConfig::dual_game(3, 4).build().unwrap()
        }

        #[test]
        fn test_only_the_flagged_head_is_evaluated() {
            let architecture = dual();
            let mut genome = with_head_biases(&architecture, 0, &[1.0]);
            let dino_bias = architecture.head_layers()[1].bias_range();
            genome.genes_mut()[dino_bias].copy_from_slice(&[1.0, 1.0]);
            let network = decode(&architecture, genome.genes());

            let flappy = network.decide(&[0.2, 0.3, 0.4, 1.0, 0.0]);
            assert_eq!(flappy.as_slice(), &[true, false, false]);

            let dino = network.decide(&[0.2, 0.3, 0.4, 0.0, 1.0]);
            assert_eq!(dino.as_slice(), &[false, true, true]);
        }

        #[test]
        fn test_no_flag_means_no_output() {
            let architecture = dual();
            let genome = Genome::from_fn(&architecture, |_| 1.0);
            let network = decode(&architecture, genome.genes());
            let decision = network.decide(&[0.2, 0.3, 0.4, 0.0, 0.5]);
            assert_eq!(decision.as_slice(), &[false, false, false]);
            assert!(network.selected_heads(&[0.2, 0.3, 0.4, 0.0, 0.5]).is_empty());
        }

        #[test]
        fn test_first_flag_wins() {
            let architecture = dual();
            let genome = Genome::zeros(&architecture);
            let network = decode(&architecture, genome.genes());
            assert_eq!(network.selected_heads(&[0.0, 0.0, 0.0, 1.0, 1.0]), 0..1);
        }

        #[test]
        fn test_slots_resolve_per_game() {
            let architecture = dual();
            let flappy = architecture.output_slot(FLAPPY_HEAD, JUMP_OUTPUT).unwrap();
            let genome = with_head_biases(&architecture, 0, &[2.0]);
            let decision = decode(&architecture, genome.genes()).decide(&[0.0, 0.0, 0.0, 1.0, 0.0]);
            assert!(decision.fired(flappy));
        }
    }

    mod trace {
        use super::*;

        #[test]
        fn test_trace_does_not_change_the_decision() {
            let architecture = ArchitectureConfig::dual_game(3, 6).build().unwrap();
            #[expect(clippy::cast_precision_loss)]
            let genome = Genome::from_fn(&architecture, |i| ((i * 7 % 13) as f32 - 6.0) / 4.0);
            let network = decode(&architecture, genome.genes());
            for features in [[0.3, -0.7, 0.1, 0.0, 1.0], [0.9, 0.2, -0.4, 1.0, 0.0]] {
                let (traced, _) = network.decide_traced(&features);
                assert_eq!(traced, network.decide(&features));
            }
        }

        #[test]
        fn test_trace_records_every_layer() {
            let mut config = ArchitectureConfig::dual_game(3, 6);
            config.hidden_sizes = vec![6, 3];
            let architecture = config.build().unwrap();
            let genome = Genome::from_fn(&architecture, |_| 0.25);
            let network = decode(&architecture, genome.genes());
            let features = [0.3, -0.7, 0.1, 0.0, 1.0];
            let (decision, trace) = network.decide_traced(&features);

            assert_eq!(trace.input, features);
            assert_eq!(trace.hidden.len(), 2);
            assert_eq!(trace.hidden[0].values.len(), 6);
            assert_eq!(trace.hidden[1].values.len(), 3);
            assert!(trace.hidden.iter().flat_map(|l| &l.values).all(|v| v.abs() < 1.0));
            assert_eq!(trace.hidden[1].weights.in_size(), 6);

            assert_eq!(trace.heads.len(), 1);
            let head = &trace.heads[0];
            assert_eq!(head.head, 1);
            assert_eq!(head.layer.values.len(), 2);
            let fired: Vec<bool> = head.layer.values.iter().map(|&v| fires(v)).collect();
            assert_eq!(&decision.as_slice()[1..3], fired.as_slice());
        }
    }
}
