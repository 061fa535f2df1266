//! Client connection management for the dungeon server
//!
//! This module handles the server-side bookkeeping of connected players:
//! - Player id assignment from a recycling pool
//! - Outbound TCP queue per connection
//! - UDP address registration from the first position datagram
//!
//! Disconnects are detected by the TCP reader hitting EOF, so there is no
//! timeout sweep here.

use crate::id_pool::IdPool;
use log::{info, warn};
use shared::Packet;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc::UnboundedSender;

/// Represents a connected client
///
/// Each client maintains:
/// - Connection metadata (ID, TCP peer address)
/// - The queue drained by its TCP writer task
/// - The UDP address it last sent positions from, once known
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: u32,
    /// TCP peer address
    pub tcp_addr: SocketAddr,
    /// Outbound reliable packets
    pub sender: UnboundedSender<Packet>,
    /// Address for unreliable updates, registered from UDP traffic
    pub udp_addr: Option<SocketAddr>,
}

impl Client {
    pub fn new(id: u32, tcp_addr: SocketAddr, sender: UnboundedSender<Packet>) -> Self {
        Self {
            id,
            tcp_addr,
            sender,
            udp_addr: None,
        }
    }

    /// Queues a packet for the writer task. Returns false once the writer
    /// has gone away.
    pub fn send(&self, packet: Packet) -> bool {
        self.sender.send(packet).is_ok()
    }
}

/// Manages all connected clients
///
/// The ClientManager enforces the player limit, hands out ids from the
/// player pool and knows where to send reliable and unreliable traffic.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Player id allocator
    ids: IdPool,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize, ids: IdPool) -> Self {
        Self {
            clients: HashMap::new(),
            ids,
            max_clients,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns Some(client_id) if successful, None if server is at capacity
    /// or the id pool is exhausted.
    pub fn add_client(&mut self, tcp_addr: SocketAddr, sender: UnboundedSender<Packet>) -> Option<u32> {
        // Enforce server capacity limits
        if self.clients.len() >= self.max_clients {
            warn!("Rejecting {}: server full ({} players)", tcp_addr, self.max_clients);
            return None;
        }

        let client_id = self.ids.get_id()?;
        info!("Client {} connected from {}", client_id, tcp_addr);
        self.clients
            .insert(client_id, Client::new(client_id, tcp_addr, sender));

        Some(client_id)
    }

    /// Removes a client from the server
    ///
    /// Returns the id to the pool and frees the UDP address. Returns true if
    /// the client was found and removed, false if they were already gone.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            self.ids.return_id(client.id);
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    /// Records the UDP address a client sends from
    ///
    /// Returns false for unknown ids so the datagram can be dropped.
    pub fn register_udp(&mut self, client_id: u32, addr: SocketAddr) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                if client.udp_addr != Some(addr) {
                    info!("Client {} registered UDP address {}", client_id, addr);
                    client.udp_addr = Some(addr);
                }
                true
            }
            None => false,
        }
    }

    pub fn is_connected(&self, client_id: u32) -> bool {
        self.clients.contains_key(&client_id)
    }

    /// Queues a packet on one client's TCP connection
    pub fn send_to(&self, client_id: u32, packet: Packet) -> bool {
        self.clients
            .get(&client_id)
            .map_or(false, |client| client.send(packet))
    }

    /// Queues a packet on every TCP connection except `exclude`
    pub fn broadcast_tcp(&self, packet: &Packet, exclude: Option<u32>) {
        for sender in self.tcp_senders_except(exclude) {
            let _ = sender.send(packet.clone());
        }
    }

    pub fn tcp_senders_except(&self, exclude: Option<u32>) -> Vec<UnboundedSender<Packet>> {
        self.clients
            .values()
            .filter(|client| Some(client.id) != exclude)
            .map(|client| client.sender.clone())
            .collect()
    }

    /// All registered UDP addresses
    pub fn udp_addrs(&self) -> Vec<SocketAddr> {
        self.clients.values().filter_map(|client| client.udp_addr).collect()
    }

    /// Registered UDP addresses of everyone but `client_id`
    pub fn udp_addrs_except(&self, client_id: u32) -> Vec<SocketAddr> {
        self.clients
            .values()
            .filter(|client| client.id != client_id)
            .filter_map(|client| client.udp_addr)
            .collect()
    }

    /// Connected ids in ascending order
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.clients.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
