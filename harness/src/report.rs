//! Optional JSON run report.
//!
//! When `--report <path>` is given, the harness persists the verdict and the
//! run's observable facts for later aggregation, alongside the exit status
//! it returns to the caller.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::validate::ValidationOutcome;

/// Everything a later reader needs to understand one harness run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub role: String,
    pub command: Vec<String>,
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
    pub exit_code: i32,
    pub duration_secs: f64,
    pub finished_at: String,
}

impl RunReport {
    pub fn new(
        role: &str,
        command: &[String],
        outcome: &ValidationOutcome,
        duration_secs: f64,
    ) -> Self {
        Self {
            role: role.to_string(),
            command: command.to_vec(),
            outcome: outcome.clone(),
            exit_code: outcome.code.exit_code(),
            duration_secs,
            finished_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Serialize the report to pretty-printed JSON with a trailing newline.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create report dir {}", parent.display()))?;
    }
    let mut payload = serde_json::to_string_pretty(report).context("serialize report")?;
    payload.push('\n');
    fs::write(path, payload).with_context(|| format!("write report {}", path.display()))?;
    Ok(())
}
