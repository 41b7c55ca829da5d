use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;

/// Result of [`FrameSlot::try_consume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing was ever published.
    NoData,
    /// The current frame was already delivered.
    Unchanged,
    /// A frame that had not been delivered yet. The slot is now marked delivered.
    Fresh(Bytes),
}

/// Point-in-time view of the slot for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotSnapshot {
    pub has_payload: bool,
    pub fresh: bool,
    pub payload_len: usize,
    /// Total number of `publish` calls.
    pub published: u64,
    /// Total number of `Fresh` outcomes handed out.
    pub delivered: u64,
}

impl SlotSnapshot {
    /// Upper bound on frames overwritten before anyone consumed them.
    pub fn dropped(&self) -> u64 {
        self.published
            .saturating_sub(self.delivered)
            .saturating_sub(u64::from(self.fresh))
    }
}

#[derive(Debug, Default)]
struct SlotState {
    payload: Option<Bytes>,
    // Invariant: fresh implies payload.is_some().
    fresh: bool,
    published: u64,
    delivered: u64,
}

/// Single-frame overwrite buffer shared by the producer and the responder.
///
/// Holds at most one encoded frame. Publishing replaces it and marks it fresh;
/// [`FrameSlot::try_consume`] hands out each publication at most once. Both
/// operations run under one mutex so a consume can never observe a half
/// written slot and two consumers can never both see the same frame as fresh.
#[derive(Debug, Default)]
pub struct FrameSlot {
    state: Mutex<SlotState>,
}

impl FrameSlot {
    /// Create an empty slot: no payload, not fresh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frame` as the current payload and mark it fresh.
    ///
    /// Any previous payload is discarded whether it was delivered or not.
    pub fn publish(&self, frame: impl Into<Bytes>) {
        let frame = frame.into();
        let mut state = self.lock();
        state.payload = Some(frame);
        state.fresh = true;
        state.published += 1;
    }

    /// Atomically test and clear freshness.
    pub fn try_consume(&self) -> Outcome {
        let mut state = self.lock();
        let Some(payload) = state.payload.clone() else {
            return Outcome::NoData;
        };
        if !state.fresh {
            return Outcome::Unchanged;
        }

        state.fresh = false;
        state.delivered += 1;
        Outcome::Fresh(payload)
    }

    /// The current payload, without touching freshness.
    pub fn peek(&self) -> Option<Bytes> {
        self.lock().payload.clone()
    }

    /// Current state and counters.
    pub fn snapshot(&self) -> SlotSnapshot {
        let state = self.lock();
        SlotSnapshot {
            has_payload: state.payload.is_some(),
            fresh: state.fresh,
            payload_len: state.payload.as_ref().map_or(0, Bytes::len),
            published: state.published,
            delivered: state.delivered,
        }
    }

    // Every critical section leaves the state consistent, so a panic in
    // another holder does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
