//! The connection hub: the public face of the realtime crate.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use wshub_core::config::hub::HubConfig;

use crate::connection::handle::{ConnectionHandle, ConnectionInfo};
use crate::connection::heartbeat::{self, HeartbeatConfig};
use crate::connection::pool::{ConnectionPool, SlotGuard};
use crate::connection::reader::{self, ReaderContext};
use crate::connection::writer::{self, WriterContext};
use crate::error::{CloseFailure, HubError};
use crate::lifecycle::Lifecycle;
use crate::message::dispatcher::{self, DeliveryContext, Dispatcher};
use crate::message::handler::{HandlerSet, MessageHandler};
use crate::message::types::{BroadcastMessage, ClientMessage};
use crate::metrics::{HubMetrics, MetricsSnapshot};
use crate::transport::Transport;

/// A bounded registry of live client connections with heartbeat, directed
/// and broadcast delivery, and coordinated shutdown.
///
/// Cheap to clone; all clones share the same state. Must be created inside a
/// Tokio runtime because construction starts the background workers.
#[derive(Debug, Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

#[derive(Debug)]
struct HubInner {
    config: HubConfig,
    pool: Arc<ConnectionPool>,
    handlers: Arc<HandlerSet>,
    dispatcher: Dispatcher,
    metrics: Arc<HubMetrics>,
    lifecycle: Lifecycle,
}

impl Hub {
    /// Create a hub and start its heartbeat and dispatch workers.
    pub fn new(config: HubConfig) -> Self {
        let metrics = Arc::new(HubMetrics::new());
        let pool = Arc::new(ConnectionPool::new(config.capacity, Arc::clone(&metrics)));
        let (dispatcher, queues) = Dispatcher::new(config.intake_buffer_size);
        let lifecycle = Lifecycle::new();

        lifecycle.spawn_worker(
            "heartbeat",
            heartbeat::run_heartbeat(
                Arc::clone(&pool),
                Arc::clone(&metrics),
                HeartbeatConfig {
                    ping_interval: config.ping_interval(),
                    write_wait: config.write_wait(),
                },
                lifecycle.token(),
            ),
        );

        let delivery = DeliveryContext {
            pool: Arc::clone(&pool),
            metrics: Arc::clone(&metrics),
            write_wait: config.write_wait(),
        };
        lifecycle.spawn_worker(
            "directed",
            dispatcher::run_directed(queues.directed, delivery.clone()),
        );
        lifecycle.spawn_worker(
            "broadcast",
            dispatcher::run_broadcast(queues.broadcast, delivery),
        );

        tracing::info!("Connection hub started (capacity {})", config.capacity);

        Self {
            inner: Arc::new(HubInner {
                config,
                pool,
                handlers: Arc::new(HandlerSet::new()),
                dispatcher,
                metrics,
                lifecycle,
            }),
        }
    }

    /// Hub configuration.
    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    /// Maximum number of simultaneously registered clients.
    pub fn capacity(&self) -> usize {
        self.inner.pool.capacity()
    }

    /// Reserve a slot for `client_id` ahead of establishing its transport.
    ///
    /// Lets a protocol front end refuse a client before upgrading the
    /// connection. The slot is released if the admission is dropped.
    pub fn admit(&self, client_id: impl Into<String>) -> Result<Admission, HubError> {
        if self.inner.lifecycle.is_closed() {
            return Err(HubError::Closed);
        }
        let client_id = client_id.into();
        if self.inner.pool.contains(&client_id) {
            return Err(HubError::AlreadyRegistered(client_id));
        }
        let slot = self.inner.pool.reserve().inspect_err(|_| {
            tracing::warn!("Refusing client '{}': pool is full", client_id);
        })?;
        Ok(Admission {
            hub: self.clone(),
            client_id,
            slot,
        })
    }

    /// Register an established transport under `client_id` and start its
    /// read and write tasks.
    pub fn register<T: Transport>(
        &self,
        client_id: impl Into<String>,
        transport: T,
    ) -> Result<(), HubError> {
        self.admit(client_id)?.register(transport)
    }

    fn attach<T: Transport>(
        &self,
        client_id: String,
        slot: SlotGuard,
        transport: T,
    ) -> Result<(), HubError> {
        let inner = &self.inner;
        if inner.lifecycle.is_closed() {
            return Err(HubError::Closed);
        }

        let cancel = inner.lifecycle.child_token();
        let (outbound, queue) = mpsc::channel(inner.config.outbound_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(client_id, outbound, cancel.clone()));

        // The writer is attached before the handle becomes visible in the
        // pool so any close that finds the entry also waits for the transport.
        let (transport_writer, transport_reader) = transport.split();
        let writer_task = tokio::spawn(writer::run_writer(
            transport_writer,
            queue,
            handle.client_id.clone(),
            handle.id,
            cancel,
            WriterContext {
                pool: Arc::clone(&inner.pool),
                metrics: Arc::clone(&inner.metrics),
                write_wait: inner.config.write_wait(),
            },
        ));
        handle.attach_writer(writer_task);

        if let Err(e) = inner.pool.insert(slot, Arc::clone(&handle)) {
            // The cancelled writer closes the transport on its own.
            handle.cancel();
            return Err(e);
        }
        // A close that began after the first check may have drained the pool
        // before the insert. Whichever side removes the entry owns the close.
        if inner.lifecycle.is_closed() && inner.pool.evict(&handle.client_id, handle.id) {
            return Err(HubError::Closed);
        }

        tokio::spawn(reader::run_reader(
            transport_reader,
            Arc::clone(&handle),
            ReaderContext {
                pool: Arc::clone(&inner.pool),
                handlers: Arc::clone(&inner.handlers),
                metrics: Arc::clone(&inner.metrics),
                read_wait: inner.config.read_wait(),
            },
        ));

        tracing::info!(
            "Client '{}' registered (connection {}, {} active)",
            handle.client_id,
            handle.id,
            inner.pool.len()
        );
        Ok(())
    }

    /// Remove `client_id` and close its transport.
    ///
    /// The entry is removed even when closing the transport fails; the
    /// failure is reported to the caller.
    pub async fn unregister(&self, client_id: &str) -> Result<(), HubError> {
        let handle = self
            .inner
            .pool
            .remove(client_id)
            .ok_or(HubError::ClientNotFound)?;
        tracing::info!("Client '{}' unregistered", client_id);
        handle.close().await.map_err(HubError::from)
    }

    /// Number of registered clients.
    pub fn count(&self) -> usize {
        self.inner.pool.len()
    }

    /// Whether `client_id` is registered.
    pub fn is_registered(&self, client_id: &str) -> bool {
        self.inner.pool.contains(client_id)
    }

    /// Registered connections, ordered by client id.
    pub async fn connections(&self) -> Vec<ConnectionInfo> {
        let mut infos = Vec::with_capacity(self.inner.pool.len());
        for handle in self.inner.pool.all_connections() {
            infos.push(handle.info().await);
        }
        infos.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        infos
    }

    /// Add a handler for every inbound application message.
    pub fn on_message<H: MessageHandler>(&self, handler: H) {
        self.inner.handlers.push(handler);
    }

    /// Queue `payload` for `client_id`. Messages for clients that are not
    /// registered at delivery time are dropped.
    pub async fn send_to(
        &self,
        client_id: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Result<(), HubError> {
        self.inner
            .dispatcher
            .send(ClientMessage::new(client_id, payload))
            .await
    }

    /// Queue `payload` for every client registered at delivery time.
    pub async fn broadcast(&self, payload: impl Into<Bytes>) -> Result<(), HubError> {
        self.inner
            .dispatcher
            .broadcast(BroadcastMessage::new(payload))
            .await
    }

    /// Current metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Number of background workers still running.
    pub fn active_workers(&self) -> usize {
        self.inner.lifecycle.active_workers()
    }

    /// Whether [`Hub::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.lifecycle.is_closed()
    }

    /// Shut the hub down.
    ///
    /// Closes every registered connection, stops accepting directed and
    /// broadcast requests, stops the workers and waits for them. Close
    /// failures are collected and returned together once everything has
    /// stopped. Calling it again is a no-op.
    pub async fn close(&self) -> Result<(), HubError> {
        let inner = &self.inner;
        if !inner.lifecycle.begin_shutdown() {
            tracing::debug!("Connection hub already closed");
            return Ok(());
        }
        tracing::info!("Shutting down connection hub ({} active)", inner.pool.len());

        let mut failures = self.close_all().await;
        inner.dispatcher.close();
        inner.lifecycle.cancel();
        inner.lifecycle.join_workers().await;
        // Registrations that raced the first drain.
        failures.extend(self.close_all().await);

        tracing::info!("Connection hub stopped");
        if failures.is_empty() {
            Ok(())
        } else {
            for failure in &failures {
                tracing::error!("Failed to close connection for {}", failure);
            }
            Err(HubError::Shutdown(failures))
        }
    }

    async fn close_all(&self) -> Vec<CloseFailure> {
        let handles = self.inner.pool.drain();
        let results =
            futures::future::join_all(handles.iter().map(|handle| handle.close())).await;

        handles
            .iter()
            .zip(results)
            .filter_map(|(handle, result)| {
                result.err().map(|error| CloseFailure {
                    client_id: handle.client_id.clone(),
                    error,
                })
            })
            .collect()
    }
}

/// A reserved slot for one client, obtained from [`Hub::admit`].
#[derive(Debug)]
pub struct Admission {
    hub: Hub,
    client_id: String,
    slot: SlotGuard,
}

impl Admission {
    /// The client this slot was reserved for.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Register the established transport into the reserved slot.
    pub fn register<T: Transport>(self, transport: T) -> Result<(), HubError> {
        let Self {
            hub,
            client_id,
            slot,
        } = self;
        hub.attach(client_id, slot, transport)
    }
}
