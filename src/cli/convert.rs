use anyhow::{Result, bail};
use std::path::Path;
use std::process::ExitCode;

use super::{Cli, Output};
use crate::config::BatchConfig;
use crate::error::PipelineError;
use crate::pipeline::Pipeline;
use crate::VERSION;
use crate::report::{RunStatus, SummaryFormat, print_summary};

pub fn execute(cli: &Cli, output: &Output) -> Result<ExitCode> {
    if let Some(path) = cli.config.as_deref() {
        if !Path::new(path).is_file() {
            bail!("Configuration file not found: {path}");
        }
    }

    let config = BatchConfig::load(cli.config.as_deref(), Some(cli.overrides()))?;
    let format = config.report.format;
    let fail_on_error = config.report.fail_on_error;
    let show_progress = config.report.show_progress && !output.is_quiet();

    let pipeline = Pipeline::from_config(config)?.with_progress(show_progress);

    if format == SummaryFormat::Text {
        output.step(&format!(
            "Converting {} -> {} ({}, {} workers)",
            cli.input.display(),
            cli.output.display(),
            pipeline.converter_name(),
            pipeline.worker_count()
        ));
    }
    output.verbose(&format!(
        "batchconv {VERSION}, strategy: {}, exclude: {:?}",
        pipeline.config().parallel.strategy,
        pipeline.config().conversion.exclude
    ));

    if cli.dry_run {
        return dry_run(&pipeline, cli, format, output);
    }

    let summary = pipeline.run(&cli.input, &cli.output)?;
    print_summary(&summary, format, output)?;

    if summary.status() == RunStatus::Incomplete {
        return Err(PipelineError::LostItems {
            expected: summary.dispatched,
            lost: summary.lost(),
        }
        .into());
    }

    Ok(ExitCode::from(summary.exit_code(fail_on_error)))
}

fn dry_run(pipeline: &Pipeline, cli: &Cli, format: SummaryFormat, output: &Output) -> Result<ExitCode> {
    let discovery = pipeline.plan(&cli.input, &cli.output)?;

    match format {
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&discovery)?),
        SummaryFormat::Text => {
            output.info(&format!(
                "{} files would be converted ({} already converted)",
                discovery.items.len(),
                discovery.already_converted
            ));
            for item in &discovery.items {
                output.list_item(&format!(
                    "{} -> {}",
                    item.input().display(),
                    item.output().display()
                ));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
