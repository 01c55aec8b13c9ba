//! The engine: quest selection, progression, and the streak/penalty state
//! machine, running against any [`Store`] backend.

pub mod clock;
pub mod progression;
pub mod quests;
pub mod streak;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::database::models::UserId;
use crate::database::Store;
use clock::{Clock, SystemClock};

pub use progression::CompletionResult;
pub use streak::{PenaltyOutcome, RedeemOutcome, StreakInfo};

/// The central entry point. Holds the store, the clock, and one async lock
/// per user so that a user's mutating operations are applied one at a time
/// while reads stay lock-free.
pub struct Engine<S> {
    store: S,
    clock: Arc<dyn Clock>,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl<S: Store> Engine<S> {
    pub fn new(store: S) -> Self {
        Engine::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Engine {
            store,
            clock,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The per-user write lock. Held across the full read-compute-write span
    /// of every mutating operation, which is what makes completion-percentage
    /// recomputation read-fresh and quest generation race-free per user.
    pub(crate) async fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
