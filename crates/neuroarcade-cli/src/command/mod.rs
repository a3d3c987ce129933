use clap::{Parser, Subcommand};

use self::{decide::DecideArg, init::InitArg, inspect::InspectArg, layout::LayoutArg};

mod decide;
mod init;
mod inspect;
mod layout;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Print the network layers and where they live in the genome
    Layout(#[clap(flatten)] LayoutArg),
    /// Write a generation-0 checkpoint with freshly sampled genes
    Init(#[clap(flatten)] InitArg),
    /// Show checkpoint metadata and gene statistics
    Inspect(#[clap(flatten)] InspectArg),
    /// Run one decision of a checkpointed agent and show its activations
    Decide(#[clap(flatten)] DecideArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Layout(arg) => layout::run(&arg)?,
        Mode::Init(arg) => init::run(&arg)?,
        Mode::Inspect(arg) => inspect::run(&arg)?,
        Mode::Decide(arg) => decide::run(&arg)?,
    }
    Ok(())
}
