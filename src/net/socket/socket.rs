/*!
 * Socket Core
 * Lifecycle, accept queue, shutdown latches, and the default I/O path
 *
 * # Locking
 *
 * One `parking_lot::Mutex` per socket guards the pending queue, the backlog,
 * the option store, and the shutdown latches, and is held for the whole of
 * each operation. Role, setup state, `connected`, and the acceptor record
 * live outside the lock: a queued peer is stamped by `accept()` while only
 * the listener's lock is held. No code path holds two sockets' locks at once.
 */

use super::options::OptionStore;
use super::types::{Domain, Role, SetupState, Shutdown, SocketError, SocketId, SocketResult, SocketType};
use crate::core::types::{Credentials, Size};
use crate::monitoring::span_operation;
use crate::net::config::SocketConfig;
use crate::net::device::DeviceRegistry;
use crate::net::transport::{Endpoint, Transport, TransportOps};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

static NEXT_SOCKET_ID: AtomicU64 = AtomicU64::new(1);

/// Combined view of the two shutdown latches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownState {
    Open,
    ReadShutdown,
    WriteShutdown,
    BothShutdown,
}

#[derive(Debug, Default)]
struct Latches {
    read: bool,
    write: bool,
}

impl Latches {
    fn state(&self) -> ShutdownState {
        match (self.read, self.write) {
            (false, false) => ShutdownState::Open,
            (true, false) => ShutdownState::ReadShutdown,
            (false, true) => ShutdownState::WriteShutdown,
            (true, true) => ShutdownState::BothShutdown,
        }
    }
}

pub(super) struct SocketInner {
    pending: VecDeque<Arc<Socket>>,
    backlog: usize,
    shutdown: Latches,
    pub(super) options: OptionStore,
}

/// A socket of any domain
///
/// Shared as `Arc<Socket>` between the descriptor table and, while awaiting
/// acceptance, a listener's pending queue.
pub struct Socket {
    id: SocketId,
    domain: Domain,
    socket_type: SocketType,
    protocol: i32,
    origin: Credentials,
    acceptor: OnceLock<Credentials>,
    role: AtomicU8,
    setup_state: AtomicU8,
    connected: AtomicBool,
    pub(super) inner: Mutex<SocketInner>,
    transport: Transport,
    pub(super) devices: DeviceRegistry,
    config: Arc<SocketConfig>,
}

impl Socket {
    pub(super) fn new(
        domain: Domain,
        socket_type: SocketType,
        protocol: i32,
        origin: Credentials,
        transport: Transport,
        devices: DeviceRegistry,
        config: Arc<SocketConfig>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_SOCKET_ID.fetch_add(1, Ordering::Relaxed),
            domain,
            socket_type,
            protocol,
            origin,
            acceptor: OnceLock::new(),
            role: AtomicU8::new(Role::Unconnected as u8),
            setup_state: AtomicU8::new(SetupState::Unstarted as u8),
            connected: AtomicBool::new(false),
            inner: Mutex::new(SocketInner {
                pending: VecDeque::new(),
                backlog: 0,
                shutdown: Latches::default(),
                options: OptionStore::default(),
            }),
            transport,
            devices,
            config,
        })
    }

    pub fn id(&self) -> SocketId {
        self.id
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn socket_type(&self) -> SocketType {
        self.socket_type
    }

    pub fn protocol(&self) -> i32 {
        self.protocol
    }

    /// Identity of the process that created the socket
    pub fn origin(&self) -> Credentials {
        self.origin
    }

    /// Identity of the process that accepted the socket; set only once the
    /// role is `Accepted`
    pub fn acceptor(&self) -> Option<Credentials> {
        self.acceptor.get().copied()
    }

    pub fn role(&self) -> Role {
        Role::from_u8(self.role.load(Ordering::Acquire))
    }

    pub fn setup_state(&self) -> SetupState {
        SetupState::from_u8(self.setup_state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn backlog(&self) -> usize {
        self.inner.lock().backlog
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn shutdown_state(&self) -> ShutdownState {
        self.inner.lock().shutdown.state()
    }

    pub fn is_shut_down_for_reading(&self) -> bool {
        self.inner.lock().shutdown.read
    }

    pub fn is_shut_down_for_writing(&self) -> bool {
        self.inner.lock().shutdown.write
    }

    pub fn set_setup_state(&self, new_state: SetupState) {
        let old = SetupState::from_u8(self.setup_state.swap(new_state as u8, Ordering::AcqRel));
        debug!(socket = self.id, from = %old, to = %new_state, "setup state changed");
    }

    fn set_role(&self, role: Role) {
        let old = Role::from_u8(self.role.swap(role as u8, Ordering::AcqRel));
        if old != role {
            debug!(socket = self.id, from = %old, to = %role, "role changed");
        }
    }

    /// Become a listener with room for `backlog` pending connections
    /// (clamped to the configured maximum)
    pub fn listen(&self, backlog: usize) -> SocketResult<()> {
        let span = span_operation("socket_listen");
        let _guard = span.enter();
        span.record("socket", &self.id.to_string());

        if !self.socket_type.is_connection_oriented() {
            span.record_error("not connection-oriented");
            return Err(SocketError::operation_not_supported(
                "listen on a connectionless socket",
            ));
        }

        let mut inner = self.inner.lock();
        match self.role() {
            Role::Unconnected | Role::Listener => {}
            _ => {
                span.record_error("already connected");
                return Err(SocketError::AlreadyConnected);
            }
        }
        // Never shrink below what is already queued
        inner.backlog = self.config.clamp_backlog(backlog).max(inner.pending.len());
        self.set_role(Role::Listener);
        info!(socket = self.id, backlog = inner.backlog, "listening");
        span.record_result(true);
        Ok(())
    }

    /// Publish a fully-formed peer for a later `accept()`
    ///
    /// Never blocks: a full queue refuses the connection immediately.
    pub fn queue_connection(&self, peer: Arc<Socket>) -> SocketResult<()> {
        if std::ptr::eq(self, Arc::as_ptr(&peer)) {
            return Err(SocketError::ConnectionRefused);
        }

        let mut inner = self.inner.lock();
        if inner.pending.len() >= inner.backlog {
            debug!(
                socket = self.id,
                pending = inner.pending.len(),
                backlog = inner.backlog,
                "backlog full, refusing connection"
            );
            return Err(SocketError::ConnectionRefused);
        }
        debug!(socket = self.id, peer = peer.id, "queueing connection");
        inner.pending.push_back(peer);
        Ok(())
    }

    /// Dequeue the oldest pending connection and hand it to `acceptor`
    pub fn accept(&self, acceptor: Credentials) -> SocketResult<Arc<Socket>> {
        let mut inner = self.inner.lock();
        let client = inner
            .pending
            .pop_front()
            .ok_or(SocketError::NoPendingConnection)?;
        debug!(socket = self.id, peer = client.id, "de-queueing connection");

        debug_assert!(!client.is_connected(), "queued peer already connected");
        // A peer leaves the queue exactly once, so the record is still empty
        let stamped = client.acceptor.set(acceptor);
        debug_assert!(stamped.is_ok(), "queued peer accepted twice");
        if let Err(rejected) = stamped {
            warn!(
                socket = self.id,
                peer = client.id,
                %rejected,
                kept = ?client.acceptor(),
                "peer already carries an acceptor record"
            );
        }
        client.set_role(Role::Accepted);
        client.connected.store(true, Ordering::Release);
        client.set_setup_state(SetupState::Completed);
        Ok(client)
    }

    /// Connect to `target` on behalf of `credentials`
    ///
    /// Stream sockets build the accepting-side peer and queue it on the
    /// listener; datagram sockets just record `target` as the default
    /// destination.
    pub fn connect(self: &Arc<Self>, target: &Arc<Socket>, credentials: Credentials) -> SocketResult<()> {
        let span = span_operation("socket_connect");
        let _guard = span.enter();
        span.record("socket", &self.id.to_string());

        let result = if Arc::ptr_eq(self, target)
            || self.domain != target.domain
            || self.socket_type != target.socket_type
        {
            Err(SocketError::ConnectionRefused)
        } else if self.socket_type.is_connection_oriented() {
            self.connect_stream(target, credentials)
        } else {
            self.connect_datagram(target)
        };

        match &result {
            Ok(()) => span.record_result(true),
            Err(e) => span.record_error(&e.to_string()),
        }
        result
    }

    fn connect_stream(&self, listener: &Arc<Socket>, credentials: Credentials) -> SocketResult<()> {
        {
            let _inner = self.inner.lock();
            match self.role() {
                Role::Unconnected => {}
                Role::Listener => {
                    return Err(SocketError::invalid_argument("listening socket cannot connect"))
                }
                Role::Connecting => return Err(SocketError::WouldBlock),
                Role::Connected | Role::Accepted => return Err(SocketError::AlreadyConnected),
            }
            self.set_role(Role::Connecting);
            self.set_setup_state(SetupState::InProgress);
        }

        if listener.role() != Role::Listener {
            self.abort_connect();
            return Err(SocketError::ConnectionRefused);
        }

        let peer = Socket::new(
            self.domain,
            self.socket_type,
            self.protocol,
            credentials,
            self.transport.new_peer(),
            self.devices.clone(),
            Arc::clone(&self.config),
        );
        if let Err(e) = Endpoint::link(self.transport.endpoint(), peer.transport.endpoint()) {
            self.abort_connect();
            return Err(e);
        }

        // Our lock is not held here: the listener's is the only one taken
        if let Err(e) = listener.queue_connection(peer) {
            self.transport.endpoint().unlink();
            self.abort_connect();
            return Err(e);
        }

        let _inner = self.inner.lock();
        self.set_role(Role::Connected);
        self.connected.store(true, Ordering::Release);
        self.set_setup_state(SetupState::Completed);
        info!(socket = self.id, listener = listener.id, "connected");
        Ok(())
    }

    fn connect_datagram(&self, target: &Arc<Socket>) -> SocketResult<()> {
        let _inner = self.inner.lock();
        self.transport.endpoint().set_destination(target.transport.endpoint())?;
        self.set_role(Role::Connected);
        self.connected.store(true, Ordering::Release);
        self.set_setup_state(SetupState::Completed);
        debug!(socket = self.id, target = target.id, "default destination set");
        Ok(())
    }

    fn abort_connect(&self) {
        let _inner = self.inner.lock();
        self.set_role(Role::Unconnected);
        self.set_setup_state(SetupState::Unstarted);
    }

    /// Shut down one or both directions
    ///
    /// Each transport hook runs at most once; repeating a direction is a no-op.
    pub fn shutdown(&self, how: Shutdown) -> SocketResult<()> {
        let mut inner = self.inner.lock();
        if self.socket_type.is_connection_oriented() && !self.is_connected() {
            return Err(SocketError::NotConnected);
        }
        if self.role() == Role::Listener {
            return Err(SocketError::NotConnected);
        }

        if how.writes() && !inner.shutdown.write {
            self.transport.shut_down_for_writing();
            inner.shutdown.write = true;
        }
        if how.reads() && !inner.shutdown.read {
            self.transport.shut_down_for_reading();
            inner.shutdown.read = true;
        }
        debug!(socket = self.id, ?how, state = ?inner.shutdown.state(), "shutdown");
        Ok(())
    }

    /// Default read path: end-of-stream once shut down for reading
    pub fn read(&self, buf: &mut [u8]) -> SocketResult<Size> {
        let inner = self.inner.lock();
        if inner.shutdown.read {
            return Ok(0);
        }
        self.transport.recvfrom(buf)
    }

    /// Default write path: EPIPE once shut down for writing
    pub fn write(&self, data: &[u8]) -> SocketResult<Size> {
        let inner = self.inner.lock();
        if inner.shutdown.write {
            return Err(SocketError::BrokenPipe);
        }
        self.transport.sendto(data)
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket")
            .field("id", &self.id)
            .field("domain", &self.domain)
            .field("type", &self.socket_type)
            .field("protocol", &self.protocol)
            .field("transport", &self.transport.name())
            .field("role", &self.role())
            .field("setup_state", &self.setup_state())
            .field("connected", &self.is_connected())
            .field("origin", &self.origin)
            .field("acceptor", &self.acceptor())
            .finish()
    }
}
