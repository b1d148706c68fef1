//! Clock-driven debouncer for search input.
//!
//! The caller owns the clock: pass a millisecond timestamp on every push and
//! poll. That keeps the type free of timers so the UI can drive it from
//! `gloo` timeouts and tests can drive it with plain integers.

/// Holds the latest value until it has been quiet for `delay_ms`.
#[derive(Clone, Debug)]
pub struct Debouncer<T> {
    delay_ms: u64,
    pending: Option<(T, u64)>,
}

impl<T> Debouncer<T> {
    /// Create a debouncer with the given quiet period.
    #[must_use]
    pub const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    /// Record a new value, replacing any pending one and restarting the wait.
    pub fn push(&mut self, value: T, now_ms: u64) {
        self.pending = Some((value, now_ms.saturating_add(self.delay_ms)));
    }

    /// Release the pending value once its deadline has passed.
    pub fn poll(&mut self, now_ms: u64) -> Option<T> {
        let due = self
            .pending
            .as_ref()
            .is_some_and(|(_, deadline)| *deadline <= now_ms);
        if due { self.flush() } else { None }
    }

    /// Release the pending value immediately (e.g. on Enter).
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Whether a value is waiting.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Milliseconds until the pending value is due, if any.
    #[must_use]
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.pending
            .as_ref()
            .map(|(_, deadline)| deadline.saturating_sub(now_ms))
    }
}
