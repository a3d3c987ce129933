use std::path::PathBuf;

use crate::config::RunConfig;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct LayoutArg {
    /// Run configuration file (JSON); defaults to the two-game network
    #[arg(long)]
    config: Option<PathBuf>,
}

pub(crate) fn run(arg: &LayoutArg) -> anyhow::Result<()> {
    let config = RunConfig::load(arg.config.as_deref())?;
    let architecture = config.build_architecture()?;

    println!("Inputs: {}", architecture.input_size());
    if let Some(range) = architecture.discriminator_range() {
        println!("  Features:      0..{}", range.start);
        println!("  Discriminator: {range:?}");
    }
    println!("Output activation: {:?}", architecture.output_activation());
    println!("Layers:");
    for (i, layer) in architecture.trunk_layers().iter().enumerate() {
        println!(
            "  hidden[{i}] {:>3} x {:<3} weights {:?} biases {:?}",
            layer.out_size(),
            layer.in_size(),
            layer.weight_range(),
            layer.bias_range()
        );
    }
    for (spec, layer) in architecture.head_specs().iter().zip(architecture.head_layers()) {
        println!(
            "  {:<9} {:>3} x {:<3} weights {:?} biases {:?} outputs {:?}",
            spec.name,
            layer.out_size(),
            layer.in_size(),
            layer.weight_range(),
            layer.bias_range(),
            spec.outputs
        );
    }
    println!("Genome size: {}", architecture.genome_size());
    Ok(())
}
