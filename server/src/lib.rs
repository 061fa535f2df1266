//! # Dungeon Server Library
//!
//! This library provides the server for the multiplayer dungeon crawler. It
//! relays player state between clients and steers every enemy in the current
//! room toward the nearest player.
//!
//! ## Core Responsibilities
//!
//! ### Enemy Steering
//! Each room's obstacle layout is stamped into a grid once. Every map update
//! from a client recomputes a flow field over that grid: players are the
//! sources, each reachable cell gets a hop distance and a direction, and
//! every enemy is handed the direction of the cell it stands on. See
//! [`flow_field`].
//!
//! ### Client Management
//! Handles the lifecycle of client connections:
//! - Connection establishment and player id assignment
//! - UDP address registration from the first position update
//! - Disconnection handling and id recycling
//!
//! ### State Relay
//! Player positions are forwarded to every other client as they arrive.
//! Room events (room changes, enemy spawns, disconnects) travel over TCP.
//!
//! ## Architecture Design
//!
//! ### Single Event Loop
//! All network events are funneled into one loop that owns the game state,
//! so room state never needs a lock. Flow field recomputes are CPU bound and
//! run on the blocking pool; their results come back into the loop as a
//! message. A recompute that finds the engine busy is skipped, not queued.
//!
//! ### TCP + UDP on one port
//! TCP carries length-prefixed reliable packets, UDP carries one packet per
//! datagram. Both sockets bind the same port.
//!
//! ## Module Organization
//!
//! - `flow_field`: grid, BFS distances, directions, engine lifecycle
//! - `game`: room state, map layout and enemy bookkeeping
//! - `client_manager`: connected clients and their outbound queues
//! - `network`: sockets, spawned tasks and the main loop
//! - `config`: TOML configuration with defaults
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::Config;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = Config::default();
//!     let mut server = Server::new(&config).await?;
//!
//!     // Accepts clients on TCP and UDP until a Shutdown message arrives
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod enemy;
pub mod flow_field;
pub mod game;
pub mod id_pool;
pub mod network;
pub mod utils;
