//! Wire types shared by the dungeon server and its clients.
//!
//! Every message is a variant of [`Packet`] encoded with bincode. Reliable
//! room/connection traffic travels over TCP inside length-prefixed frames
//! (see [`codec`]); position traffic travels over UDP, one packet per datagram.

use serde::{Deserialize, Serialize};

pub mod codec;

pub use codec::{
    compress_map, decode, decompress_map, encode, encode_frame, read_frame, write_frame,
    ProtocolError,
};

/// Pixels per grid cell. Clients send pixel coordinates; the server divides by this.
pub const SCALING_FACTOR: i32 = 10;
pub const DEFAULT_PORT: u16 = 9001;
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    // TCP, server -> client
    Connected {
        id: u32,
    },
    Welcome {
        player_id: u32,
        seed: i64,
        connected_players: Vec<u32>,
    },
    SpawnedEnemies {
        id: u32,
        enemies: Vec<EnemySpawn>,
    },

    // TCP, both directions
    Disconnected {
        id: u32,
    },
    RoomChanged {
        id: u32,
        room: u32,
    },

    // TCP, client -> server
    MapDimensions {
        compressed: Vec<u8>,
    },
    SpawnEnemyRequest {
        id: u32,
        enemies: Vec<EnemySpawn>,
    },

    // UDP
    PlayerPosition {
        entity_id: u32,
        x: i32,
        y: i32,
    },
    MapUpdate {
        id: u32,
        players: Vec<EntityPosition>,
        enemies: Vec<EntityPosition>,
    },
    EnemyDirections {
        id: u32,
        enemies: Vec<EnemyDirection>,
    },
}

/// Pixel position of a player or enemy.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct EntityPosition {
    pub id: u32,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct EnemyDirection {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct TextureData {
    pub tile_id: u32,
    pub tile_set: String,
    pub tile_layer: i32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct CollisionData {
    pub kind: i32,
    pub width: f32,
    pub height: f32,
    pub x_offset: f32,
    pub y_offset: f32,
}

/// Enemy as announced on spawn. Position is in pixels.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct EnemySpawn {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub kind: String,
    pub name: String,
    pub hp: f32,
    pub damage: f32,
    pub texture: TextureData,
    pub collision: CollisionData,
}

/// Top-left pixel corner of one obstacle tile.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Obstacle {
    pub left: i32,
    pub top: i32,
}

/// Obstacle layout of a room, sent zlib-compressed inside [`Packet::MapDimensions`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct MapDimensions {
    pub obstacles: Vec<Obstacle>,
}

impl EnemySpawn {
    pub fn at(id: u32, x: i32, y: i32) -> Self {
        Self {
            id,
            x,
            y,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enemy_spawn_at() {
        let spawn = EnemySpawn::at(12, 150, 40);
        assert_eq!(spawn.id, 12);
        assert_eq!(spawn.x, 150);
        assert_eq!(spawn.y, 40);
        assert!(spawn.name.is_empty());
        assert_eq!(spawn.hp, 0.0);
    }

    #[test]
    fn test_packet_serialization_map_update() {
        let packet = Packet::MapUpdate {
            id: 3,
            players: vec![EntityPosition { id: 1, x: 200, y: 310 }],
            enemies: vec![
                EntityPosition { id: 11, x: 40, y: 40 },
                EntityPosition { id: 12, x: -20, y: 90 },
            ],
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::MapUpdate {
                id,
                players,
                enemies,
            } => {
                assert_eq!(id, 3);
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].x, 200);
                assert_eq!(enemies.len(), 2);
                assert_eq!(enemies[1].x, -20);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_enemy_directions() {
        use assert_approx_eq::assert_approx_eq;

        let packet = Packet::EnemyDirections {
            id: 1,
            enemies: vec![EnemyDirection {
                id: 11,
                x: 0.70710677,
                y: -0.70710677,
            }],
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::EnemyDirections { enemies, .. } => {
                assert_eq!(enemies[0].id, 11);
                assert_approx_eq!(enemies[0].x, 0.70710677, 1e-6);
                assert_approx_eq!(enemies[0].y, -0.70710677, 1e-6);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
