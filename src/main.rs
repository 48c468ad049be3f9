use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;

use batchconv::cli::Cli;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    cli.run()
}
