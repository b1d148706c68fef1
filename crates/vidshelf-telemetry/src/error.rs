//! Telemetry failures.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Why logging could not be set up.
#[derive(Debug)]
pub enum TelemetryError {
    /// The configured level is not a valid filter directive.
    InvalidLevel {
        /// Directive as given.
        directive: String,
        /// Parser failure.
        source: ParseError,
    },
    /// A global subscriber is already installed.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: TryInitError,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLevel { directive, .. } => {
                write!(formatter, "invalid log level `{directive}`")
            }
            Self::SubscriberInstall { .. } => {
                formatter.write_str("failed to install tracing subscriber")
            }
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidLevel { source, .. } => Some(source),
            Self::SubscriberInstall { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::EnvFilter;

    #[test]
    fn invalid_level_names_the_directive() -> std::result::Result<(), Box<dyn Error>> {
        let Err(source) = EnvFilter::try_new("vidshelf=loud") else {
            return Err("directive unexpectedly parsed".into());
        };
        let err = TelemetryError::InvalidLevel {
            directive: "vidshelf=loud".to_string(),
            source,
        };
        assert_eq!(err.to_string(), "invalid log level `vidshelf=loud`");
        assert!(err.source().is_some());
        Ok(())
    }
}
