//! Entity location directory
//!
//! Owns the key-to-address map for one [`LocationKind`] together with the
//! active lock tickets. All operations against the same key run in arrival
//! order behind a per-key mutex; a migration lock simply keeps that mutex
//! held across the whole relocation round trip, so readers queued behind it
//! resume only once the new address is in place.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use dashmap::DashMap;
use tracing::{error, info, warn};

use locus_core::{KeyedMutex, KeyedMutexGuard};

use crate::{
    config::DirectoryConfig,
    model::{Address, LocationKind},
};

/// One in-flight "this key is migrating" reservation.
///
/// The ticket owns the key's mutex guard for the duration of the migration;
/// destroying the ticket is what wakes the queued operations. `epoch` is the
/// identity the timeout task compares against so a stale timer can never
/// disturb a newer acquisition.
struct LockTicket {
    holder: Address,
    epoch: u64,
    locked_at: Instant,
    _guard: KeyedMutexGuard<u64>,
}

/// Key-to-address directory for one location kind.
pub struct LocationDirectory {
    kind: LocationKind,
    entries: DashMap<u64, Address>,
    tickets: DashMap<u64, LockTicket>,
    next_epoch: AtomicU64,
    mutex: KeyedMutex<u64>,
}

impl LocationDirectory {
    pub fn new(kind: LocationKind, config: &DirectoryConfig) -> Self {
        Self {
            kind,
            entries: DashMap::new(),
            tickets: DashMap::new(),
            next_epoch: AtomicU64::new(0),
            mutex: KeyedMutex::new(config.queue_warn_depth),
        }
    }

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    /// Unconditionally register `address` for `key`.
    ///
    /// This is the optimistic path used for first registration; callers that
    /// need migration safety go through [`lock`](Self::lock) /
    /// [`unlock`](Self::unlock) instead.
    pub async fn add(&self, key: u64, address: Address) {
        let _guard = self.mutex.acquire(key).await;
        self.entries.insert(key, address);
        info!(kind = %self.kind, key, address = %address, "location added");
    }

    /// Drop the entry for `key`. Unknown keys are a silent no-op.
    pub async fn remove(&self, key: u64) {
        let _guard = self.mutex.acquire(key).await;
        if self.entries.remove(&key).is_some() {
            info!(kind = %self.kind, key, "location removed");
        }
    }

    /// Resolve `key` to its current address.
    ///
    /// Suspends while the key is locked and observes the post-release value,
    /// never an intermediate one.
    pub async fn get(&self, key: u64) -> Option<Address> {
        let _guard = self.mutex.acquire(key).await;
        self.entries.get(&key).map(|entry| *entry)
    }

    /// Reserve `key` for a migration by `holder`.
    ///
    /// Waits its turn behind the key's earlier operations, then holds the
    /// key until [`unlock`](Self::unlock). Requesting a lock while another
    /// ticket is active is a programming error: it is reported and the call
    /// queues behind the active ticket without touching it.
    ///
    /// With `timeout_ms > 0` a timer performs the equivalent of
    /// `unlock(key, holder, holder)` if the migration never confirms; with
    /// `timeout_ms == 0` the caller must unlock manually or the key wedges.
    pub async fn lock(self: &Arc<Self>, key: u64, holder: Address, timeout_ms: u64) {
        if let Some(ticket) = self.tickets.get(&key) {
            error!(
                kind = %self.kind,
                key,
                holder = %holder,
                current = %ticket.holder,
                "lock requested for a key that is already locked; queuing behind the active ticket"
            );
        }

        let guard = self.mutex.acquire(key).await;

        // Holding the mutex implies no ticket can exist for the key; finding
        // one means some path bypassed the queue. Leave it untouched.
        if self.tickets.contains_key(&key) {
            error!(kind = %self.kind, key, holder = %holder, "active ticket found after acquiring the key; dropping lock request");
            return;
        }

        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed) + 1;
        self.tickets.insert(
            key,
            LockTicket {
                holder,
                epoch,
                locked_at: Instant::now(),
                _guard: guard,
            },
        );
        info!(kind = %self.kind, key, holder = %holder, timeout_ms, "location locked");

        if timeout_ms > 0 {
            let directory = Arc::clone(self);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
                directory.unlock_expired(key, epoch);
            });
        }
    }

    /// Release the ticket for `key` and publish `new_address`.
    ///
    /// A missing ticket is reported and nothing is applied. A holder that
    /// does not match `expected_holder` is reported but the update still
    /// goes through; the observed system tolerates stale unlockers rather
    /// than stranding the key.
    pub fn unlock(&self, key: u64, expected_holder: Address, new_address: Address) {
        let Some((_, ticket)) = self.tickets.remove(&key) else {
            error!(
                kind = %self.kind,
                key,
                expected = %expected_holder,
                "unlock for a key that is not locked"
            );
            return;
        };

        if ticket.holder != expected_holder {
            warn!(
                kind = %self.kind,
                key,
                expected = %expected_holder,
                recorded = %ticket.holder,
                "unlock holder mismatch; applying the new address anyway"
            );
        }

        self.entries.insert(key, new_address);
        info!(
            kind = %self.kind,
            key,
            address = %new_address,
            held_ms = ticket.locked_at.elapsed().as_millis() as u64,
            "location unlocked"
        );
        // Dropping the ticket releases the key; queued operations resume in
        // arrival order.
        drop(ticket);
    }

    /// Timeout path for a ticket created with `timeout_ms > 0`.
    ///
    /// Only removes the ticket whose epoch matches the one captured at lock
    /// time; a manual unlock (or a newer lock) that replaced it makes this a
    /// no-op.
    fn unlock_expired(&self, key: u64, epoch: u64) {
        let Some((_, ticket)) = self.tickets.remove_if(&key, |_, t| t.epoch == epoch) else {
            return;
        };

        self.entries.insert(key, ticket.holder);
        warn!(
            kind = %self.kind,
            key,
            holder = %ticket.holder,
            held_ms = ticket.locked_at.elapsed().as_millis() as u64,
            "lock timed out; treating the holder as the new address"
        );
    }

    /// Whether a lock ticket is currently active for `key`.
    pub fn is_locked(&self, key: u64) -> bool {
        self.tickets.contains_key(&key)
    }

    /// Holder of the active ticket for `key`, if any.
    pub fn lock_holder(&self, key: u64) -> Option<Address> {
        self.tickets.get(&key).map(|ticket| ticket.holder)
    }

    /// Whether `key` has a registered entry (ignores lock state).
    pub fn contains(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
