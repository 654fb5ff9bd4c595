//! Per-user concurrency gating.
//!
//! Each user identity gets its own async mutex. Claiming is non-blocking:
//! while an operation for a user is in flight, further events for the same
//! user are rejected instead of queued. Operations for distinct users never
//! contend with each other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Marks a user as busy for as long as it is held.
///
/// Dropping the guard releases the user on every exit path, including early
/// returns and panics.
#[derive(Debug)]
pub struct BusyGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Process-wide set of per-user gates.
#[derive(Clone, Default)]
pub struct UserGates {
    gates: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl UserGates {
    /// Create an empty gate set.
    pub fn new() -> Self {
        Self {
            gates: Arc::new(DashMap::new()),
        }
    }

    /// Try to mark `user_id` busy.
    ///
    /// Returns `None` when an operation for the same user is already in
    /// flight. Never waits.
    pub fn try_claim(&self, user_id: i64) -> Option<BusyGuard> {
        let gate = self
            .gates
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        gate.try_lock_owned()
            .ok()
            .map(|guard| BusyGuard { _guard: guard })
    }

    /// Whether an operation for `user_id` is currently in flight.
    pub fn is_busy(&self, user_id: i64) -> bool {
        match self.gates.get(&user_id) {
            Some(gate) => gate.try_lock().is_err(),
            None => false,
        }
    }
}
