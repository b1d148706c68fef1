//! Signal bus routing helpers.

use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Signal, SignalEnvelope, SignalId};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::{self, Receiver, Sender};

/// Shared signal bus built on top of `tokio::broadcast`.
///
/// Cloning the bus is cheap; every clone publishes into the same channel.
#[derive(Clone)]
pub struct SignalBus {
    sender: Sender<SignalEnvelope>,
    replay: Arc<Mutex<VecDeque<SignalEnvelope>>>,
    replay_capacity: usize,
    next_id: Arc<Mutex<SignalId>>,
}

impl SignalBus {
    /// Construct a bus with a custom replay capacity.
    ///
    /// A zero capacity is bumped to one so the broadcast channel can be built.
    #[must_use]
    pub fn with_capacity(replay_capacity: usize) -> Self {
        let replay_capacity = replay_capacity.max(1);
        let (sender, _) = broadcast::channel(replay_capacity);
        Self {
            sender,
            replay: Arc::new(Mutex::new(VecDeque::with_capacity(replay_capacity))),
            replay_capacity,
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Subscribe to signals published from now on.
    #[must_use]
    pub fn subscribe(&self) -> SignalStream {
        SignalStream {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish a signal to all subscribers and return its id.
    ///
    /// Publishing with no live subscribers is not an error; the signal is
    /// still recorded in the replay ring.
    pub fn publish(&self, signal: Signal) -> SignalId {
        let mut next = self
            .next_id
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let id = *next;
        *next = next.saturating_add(1);
        drop(next);

        let envelope = SignalEnvelope {
            id,
            timestamp: Utc::now(),
            signal,
        };
        {
            let mut replay = self.lock_replay();
            if replay.len() == self.replay_capacity {
                let _ = replay.pop_front();
            }
            replay.push_back(envelope.clone());
        }
        let _ = self.sender.send(envelope);
        id
    }

    /// Last signal id observed in the replay buffer.
    #[must_use]
    pub fn last_signal_id(&self) -> Option<SignalId> {
        self.lock_replay().back().map(|env| env.id)
    }

    /// Collect the buffered signals emitted after the specified id.
    #[must_use]
    pub fn backlog_since(&self, id: SignalId) -> Vec<SignalEnvelope> {
        let replay = self.lock_replay();
        replay.iter().filter(|env| env.id > id).cloned().collect()
    }

    fn lock_replay(&self) -> MutexGuard<'_, VecDeque<SignalEnvelope>> {
        self.replay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalBus")
            .field("replay_capacity", &self.replay_capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish_non_exhaustive()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half handed to listeners.
pub struct SignalStream {
    receiver: Receiver<SignalEnvelope>,
}

impl SignalStream {
    /// Wait for the next signal. Returns `None` once every bus handle is gone.
    ///
    /// Lagged receivers skip the dropped signals and keep going.
    pub async fn next(&mut self) -> Option<SignalEnvelope> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next pending signal without waiting.
    ///
    /// Suited to UI loops that drain signals once per tick.
    pub fn try_next(&mut self) -> Option<SignalEnvelope> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) => return Some(envelope),
                Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain every pending signal.
    pub fn drain(&mut self) -> Vec<SignalEnvelope> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
