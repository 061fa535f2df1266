//! Server network layer: TCP for reliable room events, UDP for positions
//! and enemy directions, and the main loop tying both to the game state.

use crate::client_manager::ClientManager;
use crate::config::{Config, EnemyArchetype};
use crate::flow_field::{Direction, FlowFieldHandle, Recompute};
use crate::game::{GameState, MapLayout};
use crate::id_pool::IdPool;
use log::{debug, error, info, warn};
use shared::{decode, decompress_map, encode, read_frame, write_frame, Packet, ProtocolError};
use std::collections::HashMap;
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

pub type ServerResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Map updates between two status lines
const STATUS_EVERY: u64 = 60;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    TcpAccepted {
        stream: TcpStream,
        addr: SocketAddr,
    },
    TcpPacket {
        client_id: u32,
        packet: Packet,
    },
    TcpClosed {
        client_id: u32,
    },
    Datagram {
        packet: Packet,
        addr: SocketAddr,
    },
    /// Result of a flow field recompute that ran off the async loop.
    /// `epoch` is the room epoch the snapshot was taken in.
    DirectionsReady {
        request_id: u32,
        epoch: u64,
        directions: HashMap<u32, Direction>,
    },
    Shutdown,
}

/// Messages sent from the main loop to the UDP sender task
#[derive(Debug)]
pub enum GameMessage {
    SendDatagram {
        packet: Packet,
        addr: SocketAddr,
    },
    BroadcastDatagram {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// Main server coordinating networking, room state and enemy steering
pub struct Server {
    listener: Option<TcpListener>,
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    clients: Arc<RwLock<ClientManager>>,
    game_state: GameState,
    flow_field: FlowFieldHandle,
    archetype: EnemyArchetype,
    buffer_size: usize,
    map_updates: u64,
    tasks: Vec<JoinHandle<()>>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    /// Binds TCP and UDP on the configured address. With port 0 the UDP
    /// socket takes whatever port the listener was given.
    pub async fn new(config: &Config) -> ServerResult<Self> {
        let listener = TcpListener::bind(config.address()).await?;
        let local_addr = listener.local_addr()?;
        let socket = Arc::new(UdpSocket::bind(local_addr).await?);
        info!("Server listening on {} (TCP and UDP)", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        let ids = &config.ids;
        Ok(Server {
            listener: Some(listener),
            socket,
            local_addr,
            clients: Arc::new(RwLock::new(ClientManager::new(
                config.network.max_players,
                IdPool::new(ids.player_min, ids.player_max),
            ))),
            game_state: GameState::new(
                config.world.scaling_factor,
                IdPool::new(ids.enemy_min, ids.enemy_max),
            ),
            flow_field: FlowFieldHandle::new(config.field_settings()),
            archetype: config.archetype(),
            buffer_size: config.network.buffer_size.max(64),
            map_updates: 0,
            tasks: Vec::new(),
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sender into the main loop; `ServerMessage::Shutdown` stops it.
    pub fn control(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn flow_field(&self) -> FlowFieldHandle {
        self.flow_field.clone()
    }

    /// Spawns task that accepts TCP connections
    fn spawn_tcp_acceptor(&mut self, listener: TcpListener) {
        let server_tx = self.server_tx.clone();

        self.tasks.push(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        if let Err(e) = server_tx.send(ServerMessage::TcpAccepted { stream, addr }) {
                            error!("Failed to hand connection to main loop: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        }));
    }

    /// Spawns task that continuously listens for incoming datagrams
    fn spawn_udp_receiver(&mut self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();
        let buffer_size = self.buffer_size;

        self.tasks.push(tokio::spawn(async move {
            let mut buffer = vec![0u8; buffer_size];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match decode(&buffer[..len]) {
                        Ok(packet) => {
                            if let Err(e) = server_tx.send(ServerMessage::Datagram { packet, addr }) {
                                error!("Failed to send datagram to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to deserialize datagram from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving datagram: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        }));
    }

    /// Spawns task that processes the outgoing datagram queue
    fn spawn_udp_sender(&mut self, mut game_rx: mpsc::UnboundedReceiver<GameMessage>) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);

        self.tasks.push(tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendDatagram { packet, addr } => {
                        if let Err(e) = Self::send_datagram_impl(&socket, &packet, addr).await {
                            error!("Failed to send datagram to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastDatagram { packet, exclude } => {
                        let targets = {
                            let clients_guard = clients.read().await;
                            match exclude {
                                Some(id) => clients_guard.udp_addrs_except(id),
                                None => clients_guard.udp_addrs(),
                            }
                        };

                        for addr in targets {
                            if let Err(e) = Self::send_datagram_impl(&socket, &packet, addr).await {
                                error!("Failed to send datagram to {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        }));
    }

    /// Spawns the reader and writer tasks of one accepted connection
    fn spawn_connection(
        &self,
        client_id: u32,
        stream: TcpStream,
        mut outbound: mpsc::UnboundedReceiver<Packet>,
    ) {
        let (read_half, mut write_half) = stream.into_split();
        let server_tx = self.server_tx.clone();
        let buffer_size = self.buffer_size;

        tokio::spawn(async move {
            let mut reader = BufReader::with_capacity(buffer_size, read_half);
            loop {
                match read_frame(&mut reader).await {
                    Ok(Some(packet)) => {
                        if server_tx.send(ServerMessage::TcpPacket { client_id, packet }).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(ProtocolError::Decode(e)) => {
                        warn!("Malformed frame from client {}: {}", client_id, e);
                    }
                    Err(e) => {
                        error!("Connection to client {} failed: {}", client_id, e);
                        break;
                    }
                }
            }
            let _ = server_tx.send(ServerMessage::TcpClosed { client_id });
        });

        tokio::spawn(async move {
            while let Some(packet) = outbound.recv().await {
                if let Err(e) = write_frame(&mut write_half, &packet).await {
                    error!("Failed to write to client {}: {}", client_id, e);
                    break;
                }
            }
        });
    }

    async fn send_datagram_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), ProtocolError> {
        let data = encode(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn broadcast_datagram(&self, packet: Packet, exclude: Option<u32>) {
        if let Err(e) = self.game_tx.send(GameMessage::BroadcastDatagram { packet, exclude }) {
            error!("Failed to queue broadcast datagram: {}", e);
        }
    }

    async fn handle_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client_id = {
            let mut clients = self.clients.write().await;
            clients.add_client(addr, tx)
        };

        let Some(client_id) = client_id else {
            // dropping the stream closes the connection
            return;
        };
        self.spawn_connection(client_id, stream, rx);

        let clients = self.clients.read().await;
        let connected_players = clients
            .ids()
            .into_iter()
            .filter(|id| *id != client_id)
            .collect();
        clients.send_to(
            client_id,
            Packet::Welcome {
                player_id: client_id,
                seed: self.game_state.seed,
                connected_players,
            },
        );
        clients.broadcast_tcp(&Packet::Connected { id: client_id }, Some(client_id));
    }

    async fn handle_disconnect(&mut self, client_id: u32) {
        let removed = {
            let mut clients = self.clients.write().await;
            clients.remove_client(&client_id)
        };
        if !removed {
            return;
        }

        self.game_state.remove_player(&client_id);
        let clients = self.clients.read().await;
        clients.broadcast_tcp(&Packet::Disconnected { id: client_id }, None);
    }

    /// Processes reliable packets from one client
    async fn handle_tcp_packet(&mut self, client_id: u32, packet: Packet) {
        match packet {
            Packet::Disconnected { .. } => {
                let clients = self.clients.read().await;
                clients.broadcast_tcp(&packet, Some(client_id));
            }

            Packet::MapDimensions { compressed } => match decompress_map(&compressed) {
                Ok(map) => match self.game_state.apply_map_dimensions(&map) {
                    Some(layout) => self.allocate_flow_field(layout).await,
                    None => warn!("Client {} sent a map without obstacles", client_id),
                },
                Err(e) => warn!("Invalid map dimensions from client {}: {}", client_id, e),
            },

            Packet::RoomChanged { room, .. } => {
                self.game_state.change_room(room);
                let clients = self.clients.read().await;
                clients.broadcast_tcp(&packet, Some(client_id));
            }

            Packet::SpawnEnemyRequest { enemies, .. } => {
                let spawned = self.game_state.spawn_enemies(&enemies, &self.archetype);
                let reply = Packet::SpawnedEnemies {
                    id: client_id,
                    enemies: self.game_state.spawned_enemies(),
                };

                let clients = self.clients.read().await;
                if spawned.is_empty() {
                    clients.send_to(client_id, reply);
                } else {
                    clients.broadcast_tcp(&reply, None);
                }
            }

            other => {
                warn!("Unexpected TCP packet from client {}: {:?}", client_id, other);
            }
        }
    }

    /// Rebuilds the grid off the async loop; allocation may wait for a
    /// running recompute.
    async fn allocate_flow_field(&mut self, layout: MapLayout) {
        let handle = self.flow_field.clone();
        let MapLayout {
            width,
            height,
            offset,
            obstacles,
        } = layout;

        let result = tokio::task::spawn_blocking(move || {
            handle.allocate(obstacles, width, height, offset.x, offset.y)
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Failed to allocate flow field: {}", e);
                self.game_state.map_ready = false;
            }
            Err(e) => {
                error!("Flow field allocation task failed: {}", e);
                self.game_state.map_ready = false;
            }
        }
    }

    /// Processes unreliable packets
    async fn handle_datagram(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::PlayerPosition { entity_id, .. } => {
                let registered = {
                    let mut clients = self.clients.write().await;
                    clients.register_udp(entity_id, addr)
                };
                if !registered {
                    debug!("Dropping position of unknown player {} from {}", entity_id, addr);
                    return;
                }
                self.broadcast_datagram(packet, Some(entity_id));
            }

            Packet::MapUpdate { id, players, enemies } => {
                {
                    let mut clients = self.clients.write().await;
                    clients.register_udp(id, addr);
                }
                if !self.game_state.map_ready {
                    debug!("Map update {} before map dimensions; ignoring", id);
                    return;
                }

                self.game_state.apply_map_update(&players, &enemies);
                self.spawn_recompute(id);
            }

            other => {
                warn!("Unexpected datagram from {}: {:?}", addr, other);
            }
        }
    }

    /// Runs the flow field on a state snapshot in a blocking task; the main
    /// loop gets the directions back as `DirectionsReady`.
    fn spawn_recompute(&self, request_id: u32) {
        let (players, mut enemies) = self.game_state.snapshot();
        let epoch = self.game_state.epoch();
        let handle = self.flow_field.clone();
        let server_tx = self.server_tx.clone();

        tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            match handle.try_recompute(players, &mut enemies) {
                Ok(Recompute::Completed(report)) => {
                    debug!(
                        "Recompute {}: reached {}, directed {}, steered {} in {:?}",
                        request_id,
                        report.reached,
                        report.directed,
                        report.steered,
                        started.elapsed()
                    );
                    let directions = enemies
                        .into_iter()
                        .map(|(id, enemy)| (id, enemy.direction))
                        .collect();
                    let _ = server_tx.send(ServerMessage::DirectionsReady {
                        request_id,
                        epoch,
                        directions,
                    });
                }
                Ok(Recompute::Skipped) => {
                    debug!("Recompute {} skipped; previous one still running", request_id);
                }
                Err(e) => error!("Recompute {} failed: {}", request_id, e),
            }
        });
    }

    async fn handle_directions(
        &mut self,
        request_id: u32,
        epoch: u64,
        directions: HashMap<u32, Direction>,
    ) {
        // enemy ids are recycled, so results from a previous room must not land
        if epoch != self.game_state.epoch() {
            debug!("Dropping directions of recompute {} from a previous room", request_id);
            return;
        }
        self.game_state.apply_directions(&directions);
        let packet = Packet::EnemyDirections {
            id: request_id,
            enemies: self.game_state.enemy_directions(),
        };
        self.broadcast_datagram(packet, None);

        self.map_updates += 1;
        if self.map_updates % STATUS_EVERY == 0 {
            let client_count = self.clients.read().await.len();
            debug!(
                "Map update {}: {} clients, {} players, {} enemies in room {}",
                self.map_updates,
                client_count,
                self.game_state.players.len(),
                self.game_state.enemies.len(),
                self.game_state.room
            );
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> ServerResult<()> {
        let listener = self.listener.take().ok_or("server is already running")?;
        let game_rx = self.game_rx.take().ok_or("server is already running")?;

        // Initialize concurrent tasks
        self.spawn_tcp_acceptor(listener);
        self.spawn_udp_receiver();
        self.spawn_udp_sender(game_rx);

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::TcpAccepted { stream, addr } => {
                    self.handle_connection(stream, addr).await;
                }
                ServerMessage::TcpPacket { client_id, packet } => {
                    self.handle_tcp_packet(client_id, packet).await;
                }
                ServerMessage::TcpClosed { client_id } => {
                    self.handle_disconnect(client_id).await;
                }
                ServerMessage::Datagram { packet, addr } => {
                    self.handle_datagram(packet, addr).await;
                }
                ServerMessage::DirectionsReady {
                    request_id,
                    epoch,
                    directions,
                } => {
                    self.handle_directions(request_id, epoch, directions).await;
                }
                ServerMessage::Shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }
        Ok(())
    }
}
