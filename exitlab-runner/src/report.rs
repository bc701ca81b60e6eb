//! Report generation — JSON and Markdown artifacts for a scenario batch.
//!
//! Persisted artifacts carry a `schema_version` field; unknown versions are
//! rejected on load so stale tooling fails loudly instead of misreading new
//! fields.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::scenario::{ScenarioSummary, TargetStatus};

pub const SCHEMA_VERSION: u32 = 1;

/// On-disk wrapper around a batch summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub schema_version: u32,
    /// RFC 3339 UTC timestamp of report generation.
    pub generated_at: String,
    pub summary: ScenarioSummary,
}

impl ScenarioReport {
    pub fn new(summary: ScenarioSummary) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: chrono::Utc::now().to_rfc3339(),
            summary,
        }
    }
}

/// Serialize a report to pretty JSON.
pub fn export_json(report: &ScenarioReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ScenarioReport to JSON")
}

/// Deserialize a report from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ScenarioReport> {
    let report: ScenarioReport =
        serde_json::from_str(json).context("failed to deserialize ScenarioReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

/// Write `report_<run_id>.json` under `output_dir` and return its path.
pub fn save_report(report: &ScenarioReport, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create report dir: {}", output_dir.display()))?;
    let path = output_dir.join(format!("report_{}.json", report.summary.run_id));
    let json = export_json(report)?;
    std::fs::write(&path, &json)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Load a report previously written by [`save_report`].
pub fn load_report(path: &Path) -> Result<ScenarioReport> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// Human-readable Markdown summary of a batch.
pub fn generate_markdown(report: &ScenarioReport) -> String {
    let s = &report.summary;
    let mut md = String::with_capacity(1024);

    md.push_str("# Scenario Report\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Run ID | `{}` |\n", s.run_id));
    md.push_str(&format!("| Generated | {} |\n", report.generated_at));
    md.push_str(&format!("| Targets | {} |\n", s.outcomes.len()));
    md.push_str(&format!(
        "| Succeeded / Failed / Skipped | {} / {} / {} |\n",
        s.succeeded, s.failed, s.skipped
    ));
    md.push('\n');

    md.push_str("## Targets\n\n");
    md.push_str("| Target | Status | Final PnL | Events |\n");
    md.push_str("| --- | --- | ---: | ---: |\n");
    for outcome in &s.outcomes {
        match &outcome.status {
            TargetStatus::Completed { result } => {
                md.push_str(&format!(
                    "| {} | completed | {:.4}x | {} |\n",
                    outcome.target.label(),
                    result.final_pnl,
                    result.events.len()
                ));
            }
            TargetStatus::Failed { reason } => {
                md.push_str(&format!(
                    "| {} | failed ({}) | — | — |\n",
                    outcome.target.label(),
                    reason
                ));
            }
            TargetStatus::Skipped => {
                md.push_str(&format!("| {} | skipped | — | — |\n", outcome.target.label()));
            }
        }
    }
    md.push('\n');

    md
}
