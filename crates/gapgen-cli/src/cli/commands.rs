use super::CliError;
use anyhow::Context;
use gapgen_core::cocktail::GenerationSummary;
use gapgen_core::config::GenerationConfig;
use gapgen_core::event::record::EventWriter;
use gapgen_core::validate::{render_human_summary, run_validation, write_report, ValidationPolicy};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(clap::Args)]
pub(super) struct GenerateArgs {
    /// Run configuration path
    #[arg(long)]
    config: PathBuf,

    /// Event stream output path
    #[arg(long, default_value = "artifacts/events.jsonl")]
    output: PathBuf,

    /// Per-source provenance summary output path
    #[arg(long, default_value = "artifacts/generation-summary.json")]
    summary: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct ValidateArgs {
    /// Generated event stream path
    #[arg(long)]
    events: PathBuf,

    /// Validation policy path; built-in defaults apply when omitted
    #[arg(long)]
    policy: Option<PathBuf>,

    /// JSON report output path
    #[arg(long, default_value = "artifacts/validation-report.json")]
    report: PathBuf,
}

pub(super) fn run_generate_command(args: GenerateArgs) -> Result<i32, CliError> {
    let config = GenerationConfig::load(&args.config).map_err(CliError::Compute)?;
    let mut scheduler = config.build_scheduler().map_err(CliError::Compute)?;

    let mut writer = EventWriter::create(&args.output).map_err(CliError::Compute)?;
    for _ in 0..config.events {
        let event = scheduler.next_event().map_err(CliError::Compute)?;
        writer.write_event(&event).map_err(CliError::Compute)?;
    }
    let written = writer.finish().map_err(CliError::Compute)?;
    tracing::info!(events = written, output = %args.output.display(), "generation finished");

    let summary = GenerationSummary::from_scheduler(&scheduler);
    write_json(&args.summary, &summary)?;

    println!("Generated {} events: {}", written, args.output.display());
    for source in &summary.sources {
        println!(
            "Source {} '{}': {} delivered, {} rejected by selection",
            source.id, source.label, source.delivered, source.rejected
        );
    }
    println!("JSON summary: {}", args.summary.display());
    Ok(0)
}

pub(super) fn run_validate_command(args: ValidateArgs) -> Result<i32, CliError> {
    let policy = match &args.policy {
        Some(path) => ValidationPolicy::load(path).map_err(CliError::Compute)?,
        None => ValidationPolicy::default(),
    };

    let report = run_validation(&args.events, &policy).map_err(CliError::Compute)?;
    println!("{}", render_human_summary(&report));
    write_report(&args.report, &report).map_err(CliError::Compute)?;
    println!("JSON report: {}", args.report.display());

    if report.passed { Ok(0) } else { Ok(1) }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create '{}'", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(value).context("failed to encode summary")?;
    fs::write(path, json).with_context(|| format!("failed to write '{}'", path.display()))
}
