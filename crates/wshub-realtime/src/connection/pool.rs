//! Connection pool: the client id → connection registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use super::handle::{ConnectionHandle, ConnectionId};
use crate::error::HubError;
use crate::metrics::{HubMetrics, connections};

/// Thread-safe, capacity-bounded pool of registered connections.
///
/// Capacity is tracked by a slot counter separate from the map so that a
/// slot can be reserved before the protocol upgrade and committed once the
/// transport exists. A reserved slot counts against capacity whether or not
/// it has been committed yet.
#[derive(Debug)]
pub struct ConnectionPool {
    by_client: DashMap<String, Arc<ConnectionHandle>>,
    capacity: usize,
    slots: AtomicUsize,
    metrics: Arc<HubMetrics>,
}

impl ConnectionPool {
    /// Creates a new empty pool.
    pub fn new(capacity: usize, metrics: Arc<HubMetrics>) -> Self {
        Self {
            by_client: DashMap::new(),
            capacity,
            slots: AtomicUsize::new(0),
            metrics,
        }
    }

    /// Maximum number of simultaneously registered clients.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reserves one slot, or fails with [`HubError::PoolFull`].
    pub fn reserve(self: &Arc<Self>) -> Result<SlotGuard, HubError> {
        self.slots
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.capacity).then_some(used + 1)
            })
            .map_err(|_| {
                connections::record_rejected(&self.metrics);
                HubError::PoolFull
            })?;
        Ok(SlotGuard {
            pool: Arc::clone(self),
            armed: true,
        })
    }

    /// Commits a reserved slot to `handle`. A duplicate client id is refused
    /// and the slot released.
    pub(crate) fn insert(
        &self,
        slot: SlotGuard,
        handle: Arc<ConnectionHandle>,
    ) -> Result<(), HubError> {
        match self.by_client.entry(handle.client_id.clone()) {
            Entry::Occupied(_) => Err(HubError::AlreadyRegistered(handle.client_id.clone())),
            Entry::Vacant(vacant) => {
                vacant.insert(handle);
                slot.commit();
                connections::record_connect(&self.metrics);
                Ok(())
            }
        }
    }

    /// Removes whatever connection is registered under `client_id`.
    pub fn remove(&self, client_id: &str) -> Option<Arc<ConnectionHandle>> {
        let (_, handle) = self.by_client.remove(client_id)?;
        self.released();
        Some(handle)
    }

    /// Removes `client_id` only if it still maps to connection `conn_id`,
    /// then signals that connection to stop. Returns whether it was removed.
    ///
    /// Failure paths use this so a stale task can never evict a newer
    /// connection that reused the same client id.
    pub fn evict(&self, client_id: &str, conn_id: ConnectionId) -> bool {
        match self
            .by_client
            .remove_if(client_id, |_, handle| handle.id == conn_id)
        {
            Some((_, handle)) => {
                self.released();
                handle.cancel();
                tracing::debug!("Evicted connection {} for client '{}'", conn_id, client_id);
                true
            }
            None => false,
        }
    }

    /// Gets the connection for a client.
    pub fn get(&self, client_id: &str) -> Option<Arc<ConnectionHandle>> {
        self.by_client
            .get(client_id)
            .map(|entry| entry.value().clone())
    }

    /// Whether any connection is registered under `client_id`.
    pub fn contains(&self, client_id: &str) -> bool {
        self.by_client.contains_key(client_id)
    }

    /// Whether `client_id` is still served by connection `conn_id`.
    pub fn is_current(&self, client_id: &str, conn_id: ConnectionId) -> bool {
        self.by_client
            .get(client_id)
            .is_some_and(|entry| entry.id == conn_id)
    }

    /// Returns total number of registered connections.
    pub fn len(&self) -> usize {
        self.by_client.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_client.is_empty()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_client
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Returns all registered client ids.
    pub fn client_ids(&self) -> Vec<String> {
        self.by_client.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Removes and returns every connection.
    pub(crate) fn drain(&self) -> Vec<Arc<ConnectionHandle>> {
        self.client_ids()
            .iter()
            .filter_map(|client_id| self.remove(client_id))
            .collect()
    }

    fn released(&self) {
        self.slots.fetch_sub(1, Ordering::AcqRel);
        connections::record_disconnect(&self.metrics);
    }

    fn unreserve(&self) {
        self.slots.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A reserved pool slot. Dropping it without registering frees the slot.
#[must_use = "dropping a slot guard releases the reservation"]
#[derive(Debug)]
pub struct SlotGuard {
    pool: Arc<ConnectionPool>,
    armed: bool,
}

impl SlotGuard {
    fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if self.armed {
            self.pool.unreserve();
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::*;

    fn pool(capacity: usize) -> Arc<ConnectionPool> {
        Arc::new(ConnectionPool::new(capacity, Arc::new(HubMetrics::new())))
    }

    fn handle(client_id: &str) -> Arc<ConnectionHandle> {
        let (tx, _rx) = mpsc::channel(1);
        Arc::new(ConnectionHandle::new(client_id, tx, CancellationToken::new()))
    }

    #[test]
    fn reservations_count_against_capacity() {
        let pool = pool(2);
        let first = pool.reserve().unwrap();
        let _second = pool.reserve().unwrap();
        assert_eq!(pool.reserve().unwrap_err(), HubError::PoolFull);

        drop(first);
        assert!(pool.reserve().is_ok());
        assert_eq!(pool.metrics.snapshot().connections_rejected, 1);
    }

    #[test]
    fn duplicate_client_is_refused_and_slot_released() {
        let pool = pool(2);
        pool.insert(pool.reserve().unwrap(), handle("c1")).unwrap();

        let err = pool.insert(pool.reserve().unwrap(), handle("c1")).unwrap_err();
        assert_eq!(err, HubError::AlreadyRegistered("c1".into()));
        assert_eq!(pool.len(), 1);

        // One slot in use, one free again.
        let _slot = pool.reserve().unwrap();
        assert!(pool.reserve().is_err());
    }

    #[test]
    fn remove_frees_the_slot() {
        let pool = pool(1);
        pool.insert(pool.reserve().unwrap(), handle("c1")).unwrap();
        assert!(pool.reserve().is_err());

        assert!(pool.remove("c1").is_some());
        assert!(pool.remove("c1").is_none());
        assert!(pool.reserve().is_ok());
    }

    #[test]
    fn evict_ignores_stale_connection_ids() {
        let pool = pool(2);
        let old = handle("c1");
        pool.insert(pool.reserve().unwrap(), Arc::clone(&old)).unwrap();
        pool.remove("c1");

        let new = handle("c1");
        pool.insert(pool.reserve().unwrap(), Arc::clone(&new)).unwrap();

        assert!(!pool.evict("c1", old.id));
        assert!(pool.is_current("c1", new.id));
        assert!(new.is_alive());

        assert!(pool.evict("c1", new.id));
        assert!(!new.is_alive());
        assert!(pool.is_empty());
    }

    #[test]
    fn drain_empties_the_pool() {
        let pool = pool(3);
        for id in ["a", "b", "c"] {
            pool.insert(pool.reserve().unwrap(), handle(id)).unwrap();
        }

        let mut drained: Vec<_> = pool
            .drain()
            .iter()
            .map(|h| h.client_id.clone())
            .collect();
        drained.sort();
        assert_eq!(drained, vec!["a", "b", "c"]);
        assert!(pool.is_empty());

        let snap = pool.metrics.snapshot();
        assert_eq!(snap.connections_total, 3);
        assert_eq!(snap.connections_active, 0);
    }
}
