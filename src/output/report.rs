//! Batch report: per-job records plus aggregate counts

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::utils::Utils;

/// Aggregate counts over a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTotals {
    pub jobs: usize,
    pub succeeded: usize,
    pub skipped_existing: usize,
    pub failed: usize,
    pub rejected_rows: usize,
    pub retry_successes: usize,
    pub retry_failures: usize,
    /// Input bytes of successful jobs
    pub bytes_in: u64,
    /// Output bytes of successful jobs
    pub bytes_out: u64,
}

/// Everything a command run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub hardware_encoder: Option<bool>,
    pub outcomes: Vec<JobOutcome>,
    pub rejected: Vec<RejectedRow>,
    pub totals: BatchTotals,
}

impl BatchReport {
    pub fn new(command: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            command: command.into(),
            started_at,
            finished_at: started_at,
            hardware_encoder: None,
            outcomes: Vec::new(),
            rejected: Vec::new(),
            totals: BatchTotals::default(),
        }
    }

    /// Close the report and compute totals
    pub fn finish(
        mut self,
        outcomes: Vec<JobOutcome>,
        retry_successes: usize,
        retry_failures: usize,
    ) -> Self {
        let mut totals = BatchTotals {
            jobs: outcomes.len(),
            rejected_rows: self.rejected.len(),
            retry_successes,
            retry_failures,
            ..BatchTotals::default()
        };
        for outcome in &outcomes {
            match outcome.status {
                JobStatus::Success => {
                    totals.succeeded += 1;
                    totals.bytes_in += outcome.bytes_in;
                    totals.bytes_out += outcome.bytes_out;
                }
                JobStatus::SkippedExisting => totals.skipped_existing += 1,
                JobStatus::Failed => totals.failed += 1,
            }
        }

        self.outcomes = outcomes;
        self.totals = totals;
        self.finished_at = Utc::now();
        self
    }

    pub fn has_failures(&self) -> bool {
        self.totals.failed > 0
    }

    /// Human-readable summary
    pub fn write_summary(&self, out: &mut dyn Write) -> std::io::Result<()> {
        writeln!(out)?;
        writeln!(out, "=== {} summary ===", self.command)?;
        for outcome in &self.outcomes {
            let status = match outcome.status {
                JobStatus::Success => "ok",
                JobStatus::SkippedExisting => "skipped",
                JobStatus::Failed => "FAILED",
            };
            let encoder = outcome
                .encoder_used
                .map(|kind| format!(" [{}]", kind))
                .unwrap_or_default();
            let retried = if outcome.retried { " (retry)" } else { "" };
            writeln!(
                out,
                "  {:<8} {}{}{} -> {}",
                status,
                outcome.label,
                encoder,
                retried,
                outcome.output_path.display()
            )?;
            if let Some(error) = &outcome.error {
                writeln!(out, "           {}", error)?;
            }
        }
        for row in &self.rejected {
            writeln!(
                out,
                "  {:<8} row {} {}: {}",
                "rejected",
                row.line,
                row.camera.as_deref().unwrap_or("-"),
                row.reason
            )?;
        }

        let totals = &self.totals;
        writeln!(
            out,
            "Jobs: {} | succeeded: {} | skipped: {} | failed: {} | rejected rows: {}",
            totals.jobs,
            totals.succeeded,
            totals.skipped_existing,
            totals.failed,
            totals.rejected_rows
        )?;
        if totals.retry_successes + totals.retry_failures > 0 {
            writeln!(
                out,
                "Retry pass: {} recovered, {} still failing",
                totals.retry_successes, totals.retry_failures
            )?;
        }
        if totals.bytes_in > 0 && totals.bytes_out > 0 {
            writeln!(
                out,
                "Size: {} -> {} ({:.1}% reduction)",
                Utils::format_file_size(totals.bytes_in),
                Utils::format_file_size(totals.bytes_out),
                Utils::reduction_percent(totals.bytes_in, totals.bytes_out)
            )?;
        }
        let elapsed = (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default();
        writeln!(out, "Elapsed: {}", Utils::format_duration(elapsed))?;
        Ok(())
    }

    pub fn print_summary(&self) {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        if let Err(e) = self.write_summary(&mut handle) {
            tracing::warn!("Could not print summary: {}", e);
        }
    }

    pub fn to_json(&self) -> Result<String, DomainError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), DomainError> {
        std::fs::write(path, self.to_json()?)?;
        info!("Report written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn outcome(id: u32, status: JobStatus, bytes_in: u64, bytes_out: u64) -> JobOutcome {
        JobOutcome {
            job_id: id,
            label: format!("cam1 #{}", id),
            output_path: PathBuf::from(format!("output/{}.mp4", id)),
            status,
            bytes_in,
            bytes_out,
            attempts_used: 1,
            encoder_used: (status == JobStatus::Success).then_some(EncoderKind::Software),
            error: (status == JobStatus::Failed).then(|| "exit code 1".to_string()),
            retryable: status == JobStatus::Failed,
            retried: false,
        }
    }

    fn report() -> BatchReport {
        let mut report = BatchReport::new("extract", Utc::now());
        report.rejected.push(RejectedRow {
            line: 4,
            camera: Some("cam9".to_string()),
            placement: Some(4),
            reason: "no recording".to_string(),
        });
        report.finish(
            vec![
                outcome(1, JobStatus::Success, 4000, 1000),
                outcome(2, JobStatus::SkippedExisting, 4000, 2_000_000),
                outcome(3, JobStatus::Failed, 4000, 0),
            ],
            1,
            1,
        )
    }

    #[test]
    fn test_totals() {
        let report = report();
        assert_eq!(
            report.totals,
            BatchTotals {
                jobs: 3,
                succeeded: 1,
                skipped_existing: 1,
                failed: 1,
                rejected_rows: 1,
                retry_successes: 1,
                retry_failures: 1,
                bytes_in: 4000,
                bytes_out: 1000,
            }
        );
        assert!(report.has_failures());
    }

    #[test]
    fn test_summary_lists_every_outcome() {
        let mut buffer = Vec::new();
        report().write_summary(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("ok       cam1 #1 [software]"));
        assert!(text.contains("FAILED   cam1 #3"));
        assert!(text.contains("exit code 1"));
        assert!(text.contains("row 4 cam9: no recording"));
        assert!(text.contains("Retry pass: 1 recovered, 1 still failing"));
        assert!(text.contains("75.0% reduction"));
    }

    #[test]
    fn test_json_report_round_trips_status() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        report().write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["command"], "extract");
        assert_eq!(value["outcomes"][1]["status"], "skipped-existing");
        assert_eq!(value["totals"]["failed"], 1);
    }
}
