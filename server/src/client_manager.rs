//! Connection bookkeeping for the game server
//!
//! Every accepted WebSocket connection is registered here, whether or not it
//! ever asks for a paddle. The manager hands out connection identifiers,
//! resolves incoming frames back to their connection, and owns the outbound
//! queue of each connection so that snapshots can be fanned out without the
//! game loop ever touching a socket.
//!
//! Dropping a client's entry drops its outbound queue, which makes the
//! connection's writer task flush what is left and close the socket.
//!
//! Outbound queues are bounded. A peer that stops reading fills its queue and
//! is evicted; the server loop collects evicted ids through
//! [`ClientManager::take_evicted`] to free their paddles.

use crate::simulation::SnapshotSink;
use log::{error, info, warn};
use shared::{ClientId, Packet, Snapshot};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Frames a connection may fall behind by, about 2.5s of snapshots at 50 Hz.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 128;

/// Encoded frames waiting to be written to one connection.
pub type FrameSender = mpsc::Sender<Vec<u8>>;

/// Creates the outbound queue for one connection.
pub fn frame_channel() -> (FrameSender, mpsc::Receiver<Vec<u8>>) {
    mpsc::channel(OUTBOUND_QUEUE_CAPACITY)
}

/// A single connected peer
#[derive(Debug)]
pub struct Client {
    /// Unique connection identifier assigned by the server
    pub id: ClientId,
    /// Peer address, used to route frames from the connection task
    pub addr: SocketAddr,
    /// When the WebSocket handshake completed
    pub connected_at: Instant,
    sender: FrameSender,
}

impl Client {
    pub fn new(id: ClientId, addr: SocketAddr, sender: FrameSender) -> Self {
        Self {
            id,
            addr,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// Queues a frame without waiting for the writer.
    pub fn send(&self, frame: Vec<u8>) -> Result<(), TrySendError<Vec<u8>>> {
        self.sender.try_send(frame)
    }
}

/// Tracks all live connections and fans packets out to them
pub struct ClientManager {
    clients: HashMap<ClientId, Client>,
    next_client_id: ClientId,
    max_connections: usize,
    evicted: Vec<ClientId>,
}

impl ClientManager {
    /// Creates an empty manager. Identifiers start from 1.
    pub fn new(max_connections: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_connections,
            evicted: Vec::new(),
        }
    }

    /// Registers a new connection.
    ///
    /// Returns None when the connection limit is reached; the caller drops
    /// `sender`, which closes the socket.
    pub fn add_client(&mut self, addr: SocketAddr, sender: FrameSender) -> Option<ClientId> {
        if self.clients.len() >= self.max_connections {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {}", client_id, addr);
        self.clients
            .insert(client_id, Client::new(client_id, addr, sender));

        Some(client_id)
    }

    /// Forgets a connection. Returns true if it was still registered.
    pub fn remove_client(&mut self, client_id: &ClientId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!(
                "Client {} disconnected after {:.1}s",
                client.id,
                client.connected_at.elapsed().as_secs_f32()
            );
            true
        } else {
            false
        }
    }

    /// Ids dropped for not draining their queue since the last call.
    pub fn take_evicted(&mut self) -> Vec<ClientId> {
        std::mem::take(&mut self.evicted)
    }

    /// Queues a frame, evicting the client if its queue is full.
    fn deliver(&mut self, client_id: ClientId, frame: Vec<u8>) -> bool {
        let Some(client) = self.clients.get(&client_id) else {
            return false;
        };

        match client.send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Client {} fell {} frames behind, dropping it",
                    client_id, OUTBOUND_QUEUE_CAPACITY
                );
                self.remove_client(&client_id);
                self.evicted.push(client_id);
                false
            }
            Err(TrySendError::Closed(_)) => {
                error!("Failed to queue frame for client {}", client_id);
                false
            }
        }
    }

    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<ClientId> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Encodes and queues a packet for one connection.
    pub fn send_packet(&mut self, client_id: ClientId, packet: &Packet) -> bool {
        if !self.clients.contains_key(&client_id) {
            return false;
        }

        match packet.to_bytes() {
            Ok(frame) => self.deliver(client_id, frame),
            Err(e) => {
                error!("Failed to encode packet for client {}: {}", client_id, e);
                false
            }
        }
    }

    /// Encodes a packet once and queues it for every connection.
    pub fn broadcast_packet(&mut self, packet: &Packet) {
        let frame = match packet.to_bytes() {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to encode broadcast packet: {}", e);
                return;
            }
        };

        let ids: Vec<ClientId> = self.clients.keys().copied().collect();
        for client_id in ids {
            self.deliver(client_id, frame.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl SnapshotSink for ClientManager {
    fn broadcast(&mut self, snapshot: Snapshot) {
        self.broadcast_packet(&Packet::State(snapshot));
    }
}
