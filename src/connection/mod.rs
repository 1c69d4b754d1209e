// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The connection table: id allocation, up/down lifecycle, and a
//! FIB-nexthop refcount used to refuse deletion of a connection that routes
//! still reference (spec.md §3 "Connection").
//!
//! Grounded on `client/pool_sessions.rs`'s `Pool` — a `DashMap`-keyed table
//! of `Arc`-held per-entry state reached from a single root value — narrowed
//! from a per-session/per-TSIH table to a flat per-connection one, since the
//! forwarder has no session concept, only bare connections.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, Ordering},
};

use dashmap::DashMap;

use crate::error::{ForwarderError, TransportError};

/// The seam a concrete per-transport I/O adapter (TCP/UDP/Unix-socket;
/// excluded as external collaborators per spec.md §1) plugs into. The core
/// only ever calls through this trait object.
pub trait Transport: Send + Sync {
    /// Writes one already-framed packet. Implementations own their own
    /// internal buffering/backpressure; a write that cannot complete
    /// immediately is a [`TransportError::NotWritable`], not a block.
    fn try_write(&self, bytes: &[u8]) -> Result<(), ForwarderError>;
}

/// An in-memory transport double, useful for tests and for a connection that
/// was created (e.g. via `AddConnection`) before any real adapter attached.
#[derive(Debug, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn try_write(&self, _bytes: &[u8]) -> Result<(), ForwarderError> {
        Err(TransportError::NotWritable.into())
    }
}

/// How a listener describes the endpoint it binds (spec.md §6 "Listeners").
/// The listener itself — the thing that actually binds a socket — is the
/// excluded per-transport I/O adapter; this is only the descriptor the core
/// records against the connection it creates on accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Family {
    Tcp,
    Udp,
    Unix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerSpec {
    pub family: Family,
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Up,
    Down,
}

pub struct Connection {
    pub id: u32,
    transport: arc_swap_or_lock::Holder,
    up: AtomicBool,
    /// Number of FIB next-hops currently referencing this connection. A
    /// connection may not be deleted while this is non-zero (spec.md §3
    /// invariant); routes must be withdrawn first.
    fib_refcount: AtomicU32,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("up", &self.up.load(Ordering::Relaxed))
            .field("fib_refcount", &self.fib_refcount.load(Ordering::Relaxed))
            .finish()
    }
}

impl Connection {
    pub fn state(&self) -> ConnectionState {
        if self.up.load(Ordering::Acquire) { ConnectionState::Up } else { ConnectionState::Down }
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.up.store(matches!(state, ConnectionState::Up), Ordering::Release);
    }

    pub fn fib_refcount(&self) -> u32 {
        self.fib_refcount.load(Ordering::Relaxed)
    }

    pub fn incref(&self) {
        self.fib_refcount.fetch_add(1, Ordering::AcqRel);
    }

    pub fn decref(&self) {
        self.fib_refcount.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn send(&self, bytes: &[u8]) -> Result<(), ForwarderError> {
        if self.state() != ConnectionState::Up {
            return Err(TransportError::Closed.into());
        }
        self.transport.get().try_write(bytes)
    }

    pub fn set_transport(&self, transport: Arc<dyn Transport>) {
        self.transport.set(transport);
    }
}

/// A tiny swappable `Arc<dyn Transport>` cell. `arc-swap` is not in the
/// teacher's dependency stack, and the transport is only ever replaced once
/// (on accept) and read many times afterwards, so a plain mutex is enough —
/// named as its own module so `Connection`'s field list reads cleanly.
mod arc_swap_or_lock {
    use std::sync::{Arc, Mutex};

    use super::{NullTransport, Transport};

    pub struct Holder(Mutex<Arc<dyn Transport>>);

    impl Holder {
        pub fn new() -> Self {
            Self(Mutex::new(Arc::new(NullTransport)))
        }

        pub fn get(&self) -> Arc<dyn Transport> {
            self.0.lock().expect("connection transport lock poisoned").clone()
        }

        pub fn set(&self, transport: Arc<dyn Transport>) {
            *self.0.lock().expect("connection transport lock poisoned") = transport;
        }
    }
}

/// The connection table, keyed by connection id.
pub struct ConnectionTable {
    connections: DashMap<u32, Arc<Connection>>,
    next_id: AtomicU32,
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self { connections: DashMap::new(), next_id: AtomicU32::new(1) }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Allocates a fresh id and inserts an `Up` connection for it (used both
    /// by a listener's accept path and by the `AddConnection` control op).
    pub fn allocate(&self) -> Arc<Connection> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let conn = Arc::new(Connection {
            id,
            transport: arc_swap_or_lock::Holder::new(),
            up: AtomicBool::new(true),
            fib_refcount: AtomicU32::new(0),
        });
        self.connections.insert(id, conn.clone());
        conn
    }

    pub fn get(&self, id: u32) -> Option<Arc<Connection>> {
        self.connections.get(&id).map(|e| e.clone())
    }

    /// Inserts a connection under a caller-chosen id (the `AddConnection`
    /// control op names an explicit id rather than asking the table to
    /// allocate one). Returns `None` if that id is already present.
    pub fn add_with_id(&self, id: u32) -> Option<Arc<Connection>> {
        if self.connections.contains_key(&id) {
            return None;
        }
        let conn = Arc::new(Connection {
            id,
            transport: arc_swap_or_lock::Holder::new(),
            up: AtomicBool::new(true),
            fib_refcount: AtomicU32::new(0),
        });
        self.connections.insert(id, conn.clone());
        Some(conn)
    }

    /// Removes a connection, refusing if its FIB-nexthop refcount is
    /// non-zero (spec.md §3 invariant — routes must be withdrawn first).
    pub fn remove(&self, id: u32) -> Result<(), ForwarderError> {
        let Some(conn) = self.connections.get(&id) else {
            return Err(ForwarderError::NotFound);
        };
        if conn.fib_refcount() > 0 {
            return Err(TransportError::NotWritable.into());
        }
        drop(conn);
        self.connections.remove(&id);
        Ok(())
    }

    /// Marks a connection down without removing it from the table, the
    /// first step of connection-loss reaction (spec.md §7): the dispatcher
    /// still needs to walk the FIB to withdraw routes before the entry can
    /// be fully removed.
    pub fn mark_down(&self, id: u32) {
        if let Some(conn) = self.connections.get(&id) {
            conn.set_state(ConnectionState::Down);
        }
    }

    pub fn ids(&self) -> Vec<u32> {
        self.connections.iter().map(|e| *e.key()).collect()
    }
}
