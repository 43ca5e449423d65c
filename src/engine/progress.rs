//! Encode progress extraction and reporting callbacks

use std::io::Write;

use crate::utils::time::TimeParser;
use crate::utils::Utils;

/// Receives per-job encode progress
pub trait ProgressCallback: Send + Sync {
    /// Called when an attempt starts
    fn on_start(&self, job: &str, encoder: &str, total_seconds: Option<f64>);

    /// Called for each new encoded-time high-water mark
    fn on_progress(&self, job: &str, encoded_seconds: f64, total_seconds: Option<f64>);

    /// Called when an attempt finishes successfully
    fn on_complete(&self, job: &str);

    /// Called when an attempt fails
    fn on_error(&self, job: &str, error: &str);
}

/// Pull the encoded position out of one diagnostic line.
///
/// Understands the stats line (`... time=00:00:03.20 bitrate=...`) and the
/// `-progress` key/value form (`out_time=00:00:03.200000`).
pub fn parse_elapsed(line: &str) -> Option<f64> {
    let start = line.find("time=")? + "time=".len();
    let value = line[start..].split_whitespace().next()?;
    TimeParser::parse_clock(value)
}

/// Deduplicates progress so each distinct elapsed value is reported once
#[derive(Debug, Default)]
pub struct ProgressTracker {
    high_water: Option<f64>,
    reported: usize,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns the elapsed time if it advanced past everything seen so far.
    /// Repeats and regressions return `None` and are otherwise ignored.
    pub fn observe(&mut self, line: &str) -> Option<f64> {
        let elapsed = parse_elapsed(line)?;
        match self.high_water {
            Some(previous) if elapsed <= previous => None,
            _ => {
                self.high_water = Some(elapsed);
                self.reported += 1;
                Some(elapsed)
            }
        }
    }

    pub fn last(&self) -> Option<f64> {
        self.high_water
    }

    /// Number of updates emitted
    pub fn reported(&self) -> usize {
        self.reported
    }
}

/// Single-line progress on stderr for interactive runs
pub struct ConsoleProgressCallback {
    verbose: bool,
}

impl ConsoleProgressCallback {
    /// `verbose` adds a line per attempt start
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn start_message(&self, job: &str, encoder: &str, total_seconds: Option<f64>) -> Option<String> {
        if !self.verbose {
            return None;
        }
        Some(match total_seconds {
            Some(total) => format!("Encoding {} with {} encoder ({:.1}s)", job, encoder, total),
            None => format!("Encoding {} with {} encoder", job, encoder),
        })
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_start(&self, job: &str, encoder: &str, total_seconds: Option<f64>) {
        if let Some(message) = self.start_message(job, encoder, total_seconds) {
            eprintln!("{}", message);
        }
    }

    fn on_progress(&self, job: &str, encoded_seconds: f64, total_seconds: Option<f64>) {
        let mut stderr = std::io::stderr();
        match total_seconds.filter(|total| *total > 0.0) {
            Some(total) => {
                let percent = (encoded_seconds / total * 100.0).min(100.0);
                let bar_length = 20;
                let filled = (percent / 100.0 * bar_length as f64) as usize;
                let bar = "#".repeat(filled) + &"-".repeat(bar_length - filled);
                let _ = write!(stderr, "\r  [{}] {:>5.1}% {}", bar, percent, job);
            }
            None => {
                let _ = write!(
                    stderr,
                    "\r  {} encoded {}",
                    job,
                    TimeParser::format_clock(encoded_seconds)
                );
            }
        }
        let _ = stderr.flush();
    }

    fn on_complete(&self, job: &str) {
        eprintln!("\r  done: {}", job);
    }

    fn on_error(&self, job: &str, error: &str) {
        eprintln!("\r  failed: {}: {}", job, error);
    }
}

/// One JSON object per event on stdout, for machine consumers
pub struct JsonProgressCallback;

impl ProgressCallback for JsonProgressCallback {
    fn on_start(&self, job: &str, encoder: &str, total_seconds: Option<f64>) {
        let event = serde_json::json!({
            "event": "start",
            "job": job,
            "encoder": encoder,
            "total_seconds": total_seconds,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_progress(&self, job: &str, encoded_seconds: f64, total_seconds: Option<f64>) {
        let percent = total_seconds
            .filter(|total| *total > 0.0)
            .map(|total| (encoded_seconds / total * 100.0).min(100.0));
        let event = serde_json::json!({
            "event": "progress",
            "job": job,
            "encoded_seconds": encoded_seconds,
            "percent": percent,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_complete(&self, job: &str) {
        let event = serde_json::json!({
            "event": "complete",
            "job": job,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_error(&self, job: &str, error: &str) {
        let event = serde_json::json!({
            "event": "error",
            "job": job,
            "error": error,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }
}

/// No-op progress callback for when progress reporting is disabled
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_start(&self, _job: &str, _encoder: &str, _total_seconds: Option<f64>) {}
    fn on_progress(&self, _job: &str, _encoded_seconds: f64, _total_seconds: Option<f64>) {}
    fn on_complete(&self, _job: &str) {}
    fn on_error(&self, _job: &str, _error: &str) {}
}

/// Human-readable elapsed wall time, used in completion logs
pub fn describe_elapsed(elapsed: std::time::Duration) -> String {
    Utils::format_duration(elapsed)
}
