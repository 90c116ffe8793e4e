//! Per-key asynchronous mutual exclusion
//!
//! Serializes logical operations against the same key while letting
//! unrelated keys proceed independently. Waiters are queued FIFO and only
//! the calling task suspends; the OS thread stays free for other work.
//!
//! This is the short-critical-section primitive: a holder keeps the guard
//! for one bookkeeping step, or hands it to a longer-lived reservation that
//! releases it later (the location lock protocol does exactly that).

use std::{collections::HashMap, fmt::Debug, hash::Hash, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::warn;

use locus_common::DEFAULT_QUEUE_WARN_DEPTH;

struct Slot {
    lock: Arc<AsyncMutex<()>>,
    /// Holder plus queued waiters for this key.
    depth: usize,
}

/// FIFO-fair mutual exclusion scoped to a single key.
///
/// Slots are created on first use and reclaimed as soon as the last guard
/// for the key is dropped, so the table only ever holds contended keys.
pub struct KeyedMutex<K: Eq + Hash + Copy + Debug> {
    slots: Arc<Mutex<HashMap<K, Slot>>>,
    warn_depth: usize,
}

impl<K: Eq + Hash + Copy + Debug> KeyedMutex<K> {
    pub fn new(warn_depth: usize) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            warn_depth,
        }
    }

    /// Acquire the mutex for `key`, suspending the calling task until every
    /// earlier caller for the same key has released it.
    ///
    /// The returned guard releases on drop, on every exit path. Dropping the
    /// acquire future itself (timeout, `select!`) unwinds the waiter
    /// accounting the same way.
    pub async fn acquire(&self, key: K) -> KeyedMutexGuard<K> {
        let lock = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(key).or_insert_with(|| Slot {
                lock: Arc::new(AsyncMutex::new(())),
                depth: 0,
            });
            slot.depth += 1;
            if slot.depth > self.warn_depth {
                warn!(
                    key = ?key,
                    depth = slot.depth,
                    "keyed mutex queue is unusually deep; a holder may be stuck"
                );
            }
            slot.lock.clone()
        };

        // Registered before the await: a caller cancelled while queued drops
        // this and gives its depth back.
        let registration = WaiterRegistration {
            key,
            slots: self.slots.clone(),
        };

        // tokio's mutex queues waiters fairly, which is what gives same-key
        // operations their arrival-order guarantee.
        let permit = lock.lock_owned().await;

        KeyedMutexGuard {
            _permit: permit,
            _registration: registration,
        }
    }

    /// Holder plus queued waiters currently registered for `key`.
    pub fn waiters(&self, key: K) -> usize {
        self.slots.lock().get(&key).map(|s| s.depth).unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.lock().len()
    }
}

impl<K: Eq + Hash + Copy + Debug> Default for KeyedMutex<K> {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_WARN_DEPTH)
    }
}

/// One registered caller's claim on a slot's depth count.
///
/// Dropped either inside the guard after a completed acquisition or by the
/// abandoned acquire future itself, so the count unwinds on both paths.
struct WaiterRegistration<K: Eq + Hash + Copy + Debug> {
    key: K,
    slots: Arc<Mutex<HashMap<K, Slot>>>,
}

impl<K: Eq + Hash + Copy + Debug> Drop for WaiterRegistration<K> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.depth -= 1;
            if slot.depth == 0 {
                slots.remove(&self.key);
            }
        }
    }
}

/// Scoped handle for one acquisition of a [`KeyedMutex`].
///
/// Dropping the guard wakes the next queued waiter for the key and reclaims
/// the slot once nobody is registered for it.
pub struct KeyedMutexGuard<K: Eq + Hash + Copy + Debug> {
    // Field order is load-bearing: the permit must drop before the
    // registration so the next waiter is runnable before the slot can be
    // reclaimed.
    _permit: OwnedMutexGuard<()>,
    _registration: WaiterRegistration<K>,
}
