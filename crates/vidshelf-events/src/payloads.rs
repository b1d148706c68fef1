//! Signal payload types carried across the client.

use chrono::{DateTime, Utc};

/// Identifier assigned to each signal published on the bus.
pub type SignalId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 64;

/// Typed process-wide signals.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    /// The API answered 401; cached identity has been cleared.
    AuthRequired {
        /// Request path that triggered the signal.
        path: String,
    },
    /// An error body flagged that the YouTube link must be re-authorised.
    ReauthRequired {
        /// Message extracted from the error body.
        message: String,
    },
    /// Every cached query result must be evicted (for example on logout).
    CacheClear {
        /// Short reason recorded for diagnostics.
        reason: String,
    },
}

impl Signal {
    /// Machine-friendly discriminator for listeners and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AuthRequired { .. } => "auth_required",
            Self::ReauthRequired { .. } => "reauth_required",
            Self::CacheClear { .. } => "cache_clear",
        }
    }
}

/// Metadata wrapper around signals. Each envelope tracks the signal id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct SignalEnvelope {
    /// Sequential identifier assigned by the bus.
    pub id: SignalId,
    /// Emission timestamp.
    pub timestamp: DateTime<Utc>,
    /// Signal payload.
    pub signal: Signal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_serialize_with_type_tag() {
        let value = serde_json::to_value(Signal::CacheClear {
            reason: "logout".into(),
        })
        .unwrap();
        assert_eq!(value["type"], "cache_clear");
        assert_eq!(value["reason"], "logout");
    }
}
