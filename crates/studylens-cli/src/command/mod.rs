use clap::{Parser, Subcommand};

use self::{analyze::AnalyzeArg, power::PowerArg};

mod analyze;
mod power;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Normalize a study-data export and compute summaries
    Analyze(#[clap(flatten)] AnalyzeArg),
    /// Compute required sample size and per-story capacity
    Power(#[clap(flatten)] PowerArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Analyze(arg) => analyze::run(&arg)?,
        Mode::Power(arg) => power::run(&arg)?,
    }
    Ok(())
}
