//! Common utilities and helpers

use std::time::Duration;

pub mod time;

/// Formatting helpers for summaries and progress lines
pub struct Utils;

impl Utils {
    /// Format duration for display
    pub fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {:02}m {:02}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {:02}s", minutes, seconds)
        } else {
            format!("{:.1}s", duration.as_secs_f64())
        }
    }

    /// Format file size for display
    pub fn format_file_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Percentage saved going from `before` to `after` bytes
    pub fn reduction_percent(before: u64, after: u64) -> f64 {
        if before == 0 {
            0.0
        } else {
            (1.0 - after as f64 / before as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_file_size() {
        assert_eq!(Utils::format_file_size(512), "512 B");
        assert_eq!(Utils::format_file_size(1536), "1.50 KB");
        assert_eq!(Utils::format_file_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(Utils::format_duration(Duration::from_millis(4500)), "4.5s");
        assert_eq!(Utils::format_duration(Duration::from_secs(125)), "2m 05s");
        assert_eq!(Utils::format_duration(Duration::from_secs(3725)), "1h 02m 05s");
    }

    #[test]
    fn test_reduction_percent() {
        assert_eq!(Utils::reduction_percent(0, 10), 0.0);
        assert_eq!(Utils::reduction_percent(200, 50), 75.0);
    }
}
