// Tracing log adapter - Structured logging using tracing crate

use tracing_subscriber::{fmt, EnvFilter};

use crate::domain::errors::*;

/// Installs the process-wide tracing subscriber
pub struct TracingLogAdapter;

impl TracingLogAdapter {
    /// Map a CLI level name onto a filter directive
    pub fn level_directive(level: &str) -> Result<&'static str, DomainError> {
        match level.trim().to_lowercase().as_str() {
            "trace" => Ok("trace"),
            "debug" => Ok("debug"),
            "info" => Ok("info"),
            "warn" | "warning" => Ok("warn"),
            "error" => Ok("error"),
            other => Err(DomainError::BadArgs(format!("Unknown log level: {}", other))),
        }
    }

    /// `RUST_LOG` wins over `level`. Logs go to stderr so reports on stdout stay clean.
    /// A second call is a no-op.
    pub fn init(level: &str, json: bool) -> Result<(), DomainError> {
        let directive = Self::level_directive(level)?;
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

        let builder = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false);

        let installed = if json {
            tracing::subscriber::set_global_default(builder.json().finish())
        } else {
            tracing::subscriber::set_global_default(builder.finish())
        };
        if installed.is_err() {
            tracing::debug!("Tracing subscriber already installed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(TracingLogAdapter::level_directive("INFO").unwrap(), "info");
        assert_eq!(TracingLogAdapter::level_directive("warning").unwrap(), "warn");
        assert!(TracingLogAdapter::level_directive("loud").is_err());
    }

    #[test]
    fn test_init_twice_is_harmless() {
        TracingLogAdapter::init("debug", false).unwrap();
        TracingLogAdapter::init("info", true).unwrap();
    }
}
