//! Signal topic identifiers used by listeners.

/// Machine-friendly discriminator for a signal.
#[must_use]
pub const fn signal_kind(signal: &crate::payloads::Signal) -> &'static str {
    signal.kind()
}
