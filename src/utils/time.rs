//! Clock-style time parsing and formatting

/// Parser for the `HH:MM:SS.xx` clocks the media tool prints
pub struct TimeParser;

impl TimeParser {
    /// Parse `HH:MM:SS(.frac)` into seconds. Negative or malformed clocks yield `None`.
    pub fn parse_clock(value: &str) -> Option<f64> {
        let mut parts = value.trim().split(':');
        let hours: u64 = parts.next()?.parse().ok()?;
        let minutes: u64 = parts.next()?.parse().ok()?;
        let seconds: f64 = parts.next()?.parse().ok()?;
        if parts.next().is_some() || minutes >= 60 || !(0.0..60.0).contains(&seconds) {
            return None;
        }
        Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
    }

    /// Format seconds as `HH:MM:SS.ms`
    pub fn format_clock(seconds: f64) -> String {
        let seconds = seconds.max(0.0);
        let hours = (seconds / 3600.0) as u32;
        let minutes = ((seconds % 3600.0) / 60.0) as u32;
        let secs = (seconds % 60.0) as u32;
        let milliseconds = ((seconds % 1.0) * 1000.0) as u32;

        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, milliseconds)
    }
}
