//! Command-line entry point for dialogue replay.

use clap::Parser;
use reprise::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    reprise::init_logging(cli.verbose);
    reprise::cli::run(cli)
}
