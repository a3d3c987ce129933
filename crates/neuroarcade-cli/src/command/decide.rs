use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use neuroarcade_harness::{episode::Harness, features::FEATURE_COUNT, world::GameKind};
use serde::Serialize;

use crate::{config::RunConfig, util};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct DecideArg {
    /// Checkpoint holding the agent
    checkpoint: PathBuf,
    /// Game the features come from (`flappy` or `dino`)
    #[arg(long)]
    game: GameKind,
    /// Normalized game features, comma separated
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true, required = true)]
    features: Vec<f32>,
    /// Run configuration file (JSON); defaults to the two-game network
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct DecisionReport {
    game: GameKind,
    input: Vec<f32>,
    hidden: Vec<Vec<f32>>,
    heads: Vec<HeadReport>,
    action: String,
}

#[derive(Debug, Serialize)]
struct HeadReport {
    name: String,
    outputs: Vec<OutputReport>,
}

#[derive(Debug, Serialize)]
struct OutputReport {
    name: String,
    value: f32,
    fired: bool,
}

pub(crate) fn run(arg: &DecideArg) -> anyhow::Result<()> {
    let config = RunConfig::load(arg.config.as_deref())?;
    let architecture = config.build_architecture()?;
    let record = util::read_checkpoint(&arg.checkpoint)?;
    let agent = util::checkpoint_agent(&record, Arc::clone(&architecture), &arg.checkpoint)?;
    let harness = Harness::new(Arc::clone(&architecture)).context("Network cannot play the games")?;

    let features: [f32; FEATURE_COUNT] = arg.features.as_slice().try_into().with_context(|| {
        format!(
            "Expected {FEATURE_COUNT} features, got {}",
            arg.features.len()
        )
    })?;
    let input = harness.input_for(arg.game, &features)?;
    let (decision, trace) = agent.decide_with_activations(&input);
    let action = harness.action_for(arg.game, &decision)?;

    let heads = trace
        .heads
        .iter()
        .map(|head| {
            let spec = &architecture.head_specs()[head.head];
            let fired = &decision.as_slice()[architecture.head_output_range(head.head)];
            HeadReport {
                name: spec.name.clone(),
                outputs: spec
                    .outputs
                    .iter()
                    .zip(&head.layer.values)
                    .zip(fired)
                    .map(|((name, &value), &fired)| OutputReport {
                        name: name.clone(),
                        value,
                        fired,
                    })
                    .collect(),
            }
        })
        .collect::<Vec<_>>();

    eprintln!(
        "Agent from generation {} (fitness {:.3}) plays {}: {action:?}",
        record.generation, record.fitness, arg.game
    );
    for head in &heads {
        for output in &head.outputs {
            eprintln!(
                "  {}.{} = {:.4} => {}",
                head.name, output.name, output.value, output.fired
            );
        }
    }

    let report = DecisionReport {
        game: arg.game,
        input: trace.input.clone(),
        hidden: trace.hidden.iter().map(|layer| layer.values.clone()).collect(),
        heads,
        action: format!("{action:?}"),
    };
    util::write_json(&report, None)
}
