use crate::domain::{GapError, GapResult, SourceId};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub generated_at_unix_seconds: u64,
    pub passed: bool,
    pub events_path: String,
    pub event_count: u64,
    pub source_counts: Vec<SourceCountReport>,
    pub species: Vec<SpeciesDecayReport>,
    pub checks: Vec<CheckReport>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCountReport {
    pub source: SourceId,
    pub events: u64,
    pub fraction: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesDecayReport {
    pub pdg: i32,
    pub signal_count: u64,
    pub good_decay_count: u64,
    pub good_decay_fraction: f64,
    pub min_required_fraction: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

pub fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

pub fn render_human_summary(report: &ValidationReport) -> String {
    let mut lines = Vec::new();
    let status = if report.passed { "PASS" } else { "FAIL" };
    lines.push(format!("Validation status: {}", status));
    lines.push(format!(
        "Events: {} ({})",
        report.event_count, report.events_path
    ));

    for count in &report.source_counts {
        lines.push(format!(
            "Source {}: {} events (fraction={:.4})",
            count.source, count.events, count.fraction
        ));
    }

    for species in &report.species {
        let species_status = if species.passed { "PASS" } else { "FAIL" };
        lines.push(format!(
            "Species {}: {} ({}/{} good decays, fraction={:.4}, required>={:.4})",
            species.pdg,
            species_status,
            species.good_decay_count,
            species.signal_count,
            species.good_decay_fraction,
            species.min_required_fraction
        ));
    }

    for check in &report.checks {
        let check_status = if check.passed { "PASS" } else { "FAIL" };
        lines.push(format!(
            "Check {}: {} ({})",
            check.name, check_status, check.detail
        ));
    }

    lines.join("\n")
}

pub fn write_report(path: &Path, report: &ValidationReport) -> GapResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| {
                GapError::io_system(
                    "IO.REPORT_DIR",
                    format!("failed to create '{}': {}", parent.display(), source),
                )
            })?;
        }
    }
    let json = serde_json::to_string_pretty(report).map_err(|source| {
        GapError::internal(
            "SYS.REPORT_ENCODE",
            format!("failed to encode validation report: {source}"),
        )
    })?;
    fs::write(path, json).map_err(|source| {
        GapError::io_system(
            "IO.REPORT_WRITE",
            format!("failed to write '{}': {}", path.display(), source),
        )
    })
}
