use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::aggregator::{RunStatus, RunSummary};
use crate::cli::Output;

/// How the final summary is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    /// Human-readable text output
    Text,
    /// JSON document on stdout
    Json,
}

/// Print the summary in the requested format
pub fn print_summary(summary: &RunSummary, format: SummaryFormat, output: &Output) -> Result<()> {
    match format {
        SummaryFormat::Text => print_text(summary, output),
        SummaryFormat::Json => println!("{}", to_json(summary)?),
    }
    Ok(())
}

pub fn to_json(summary: &RunSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

fn print_text(summary: &RunSummary, output: &Output) {
    let run = &summary.run;

    output.header("Conversion summary");
    output.key_value("Input:", &run.input_root.display().to_string(), false);
    output.key_value("Output:", &run.output_root.display().to_string(), false);
    output.key_value("Converter:", &run.converter, false);
    output.key_value(
        "Strategy:",
        &format!("{} ({} workers)", run.strategy, run.workers),
        false,
    );
    output.blank_line();

    output.summary_stats("Candidates found:", run.candidates);
    output.summary_stats("Already converted:", run.already_converted);
    if run.duplicates > 0 {
        output.summary_stats("Duplicate outputs skipped:", run.duplicates);
    }
    output.summary_stats("Dispatched:", summary.dispatched);
    output.summary_stats("Converted:", summary.succeeded);
    output.summary_stats("Failed:", summary.failed);

    if output.is_verbose() {
        for (worker_id, count) in &summary.per_worker {
            output.verbose_breakdown(&format!("items on worker {worker_id}"), *count);
        }
    }

    if !summary.failures.is_empty() {
        output.category("Failures");
        for failure in &summary.failures {
            output.list_item(&format!("[{}] {}", failure.kind, failure.message));
        }
    }

    output.blank_line();
    let elapsed = run.duration_ms as f64 / 1000.0;
    match summary.status() {
        RunStatus::Complete => output.success(&format!(
            "Converted {} files in {:.2}s",
            summary.succeeded, elapsed
        )),
        RunStatus::CompletedWithFailures => output.warning(&format!(
            "Finished {} files in {:.2}s, {} failed",
            summary.outcomes, elapsed, summary.failed
        )),
        RunStatus::Incomplete => output.error(&format!(
            "{} of {} files produced no result",
            summary.lost(),
            summary.dispatched
        )),
    }
}
