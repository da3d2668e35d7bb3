//! Append-only audit log: one JSON object per line, tagged by pipeline stage.
//!
//! The pipeline never reads this file back; it exists for offline inspection.
//! Callers treat write failures as non-fatal (logged at debug and dropped).

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chronos_core::event::{ScheduleEvent, TimeInterval};
use chronos_core::task::Task;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuditRecord<'a> {
    Parse {
        text: &'a str,
        date_iso: &'a str,
        tasks: &'a [Task],
    },
    Optimize {
        tasks: &'a [Task],
        busy: &'a [TimeInterval],
        free_windows: &'a [TimeInterval],
        events: &'a [ScheduleEvent],
    },
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn record(&self, record: &AuditRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(record).context("serialize audit record")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        writeln!(file, "{line}").with_context(|| format!("append {}", self.path.display()))?;
        Ok(())
    }
}

/// Read every record back as raw JSON values. Inspection/test helper only.
pub fn read_records(path: &PathBuf) -> Result<Vec<Value>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    s.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).context("parse audit line"))
        .collect()
}
