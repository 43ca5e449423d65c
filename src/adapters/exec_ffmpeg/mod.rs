//! FFmpeg execution adapter
//!
//! Runs the `ffmpeg` binary as a subprocess and streams its stderr line by line.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::domain::errors::*;
use crate::ports::*;

/// Diagnostic lines kept for error messages
const STDERR_TAIL_LINES: usize = 20;

/// FFmpeg-based execution adapter
pub struct FFmpegAdapter {
    binary: String,
    probe_timeout: Duration,
}

impl FFmpegAdapter {
    /// Create new FFmpeg adapter
    pub fn new(binary: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            probe_timeout,
        }
    }
}

/// Splits a byte stream into lines on `\n` and on the bare `\r` ffmpeg uses for stats
#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    /// Feed a chunk; every completed non-empty line is passed to `emit`
    pub fn push(&mut self, chunk: &[u8], emit: &mut dyn FnMut(String)) {
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                self.flush(emit);
            } else {
                self.pending.push(byte);
            }
        }
    }

    /// Emit whatever is left once the stream ends
    pub fn flush(&mut self, emit: &mut dyn FnMut(String)) {
        if !self.pending.is_empty() {
            let line = String::from_utf8_lossy(&self.pending).into_owned();
            self.pending.clear();
            emit(line);
        }
    }
}

#[async_trait]
impl MediaToolPort for FFmpegAdapter {
    async fn list_encoders(&self) -> Result<String, DomainError> {
        let output = Command::new(&self.binary)
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.probe_timeout, output)
            .await
            .map_err(|_| {
                DomainError::ToolProbeFailed(format!(
                    "{} -encoders timed out after {}s",
                    self.binary,
                    self.probe_timeout.as_secs()
                ))
            })?
            .map_err(|e| DomainError::ToolProbeFailed(format!("cannot run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            return Err(DomainError::ToolProbeFailed(format!(
                "{} -encoders exited with {}",
                self.binary, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run(
        &self,
        args: &[String],
        on_line: &mut (dyn for<'l> FnMut(&'l str) + Send),
    ) -> Result<ToolExit, DomainError> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                std::io::Error::new(e.kind(), format!("cannot spawn {}: {}", self.binary, e))
            })?;

        let mut stderr = child.stderr.take().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stderr was not captured")
        })?;

        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut splitter = LineSplitter::default();
        let mut buffer = [0u8; 8192];
        let mut emit = |line: String| {
            trace!("{}", line);
            on_line(&line);
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        };

        loop {
            let read = stderr.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            splitter.push(&buffer[..read], &mut emit);
        }
        splitter.flush(&mut emit);

        let status = child.wait().await?;
        debug!("{} finished with {}", self.binary, status);

        if status.success() {
            Ok(ToolExit {
                code: status.code(),
                success: true,
                stderr_tail: tail.into_iter().collect(),
            })
        } else {
            Ok(ToolExit::failed(status.code(), tail.into_iter().collect()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splitter_handles_carriage_returns() {
        let mut splitter = LineSplitter::default();
        let mut lines = Vec::new();
        let mut emit = |line: String| lines.push(line);

        splitter.push(b"Input #0\nframe=1 time=00:00:00.03\rframe=2 ti", &mut emit);
        splitter.push(b"me=00:00:00.06\r\n", &mut emit);
        splitter.push(b"trailing", &mut emit);
        splitter.flush(&mut emit);

        assert_eq!(
            lines,
            vec![
                "Input #0",
                "frame=1 time=00:00:00.03",
                "frame=2 time=00:00:00.06",
                "trailing"
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_streams_stderr_lines_and_exit_code() {
        let adapter = FFmpegAdapter::new("sh", Duration::from_secs(5));
        let args: Vec<String> = [
            "-c",
            "printf 'frame=1 time=00:00:01.00\\rframe=2 time=00:00:02.00\\nError opening\\n' >&2; exit 3",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut lines = Vec::new();
        let mut collect = |line: &str| lines.push(line.to_string());
        let exit = adapter.run(&args, &mut collect).await.unwrap();

        assert_eq!(
            lines,
            vec![
                "frame=1 time=00:00:01.00",
                "frame=2 time=00:00:02.00",
                "Error opening"
            ]
        );
        assert!(!exit.success);
        assert_eq!(exit.code, Some(3));
        assert_eq!(exit.stderr_tail.last().map(String::as_str), Some("Error opening"));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_probe() {
        let adapter = FFmpegAdapter::new("camreel-no-such-binary", Duration::from_secs(5));
        assert!(matches!(
            adapter.list_encoders().await,
            Err(DomainError::ToolProbeFailed(_))
        ));

        let mut ignore = |_: &str| {};
        assert!(adapter.run(&["-version".to_string()], &mut ignore).await.is_err());
    }
}
