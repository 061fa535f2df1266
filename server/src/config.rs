use crate::flow_field::direction::CornerProbe;
use crate::flow_field::engine::DEFAULT_MAX_CELLS;
use crate::flow_field::FieldSettings;
use log::info;
use serde::Deserialize;
use shared::{CollisionData, TextureData, DEFAULT_PORT, SCALING_FACTOR};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub ids: IdConfig,
    #[serde(default)]
    pub enemies: Vec<EnemyArchetype>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_players")]
    pub max_players: usize,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorldConfig {
    /// Pixels per grid cell.
    #[serde(default = "default_scaling_factor")]
    pub scaling_factor: i32,
    #[serde(default = "default_collision_padding")]
    pub collision_padding: i32,
    #[serde(default = "default_tile_cells")]
    pub tile_cells: i32,
    #[serde(default = "default_enemy_footprint")]
    pub enemy_footprint: i32,
    #[serde(default = "default_restrict_to_region")]
    pub restrict_to_region: bool,
    /// Rooms larger than this many cells are refused.
    #[serde(default = "default_max_cells")]
    pub max_cells: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdConfig {
    #[serde(default = "default_player_min")]
    pub player_min: u32,
    #[serde(default = "default_player_max")]
    pub player_max: u32,
    #[serde(default = "default_enemy_min")]
    pub enemy_min: u32,
    #[serde(default = "default_enemy_max")]
    pub enemy_max: u32,
}

/// Stats handed to every enemy spawned from a client request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnemyArchetype {
    #[serde(default = "default_enemy_kind")]
    pub kind: String,
    #[serde(default = "default_enemy_name")]
    pub name: String,
    #[serde(default = "default_enemy_hp")]
    pub hp: f32,
    #[serde(default = "default_enemy_damage")]
    pub damage: f32,
    #[serde(default = "default_enemy_texture")]
    pub texture: TextureData,
    #[serde(default = "default_enemy_collision")]
    pub collision: CollisionData,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_players() -> usize {
    8
}

fn default_buffer_size() -> usize {
    4096
}

fn default_scaling_factor() -> i32 {
    SCALING_FACTOR
}

fn default_collision_padding() -> i32 {
    2
}

fn default_tile_cells() -> i32 {
    16
}

fn default_enemy_footprint() -> i32 {
    3
}

fn default_restrict_to_region() -> bool {
    true
}

fn default_max_cells() -> usize {
    DEFAULT_MAX_CELLS
}

fn default_player_min() -> u32 {
    1
}

fn default_player_max() -> u32 {
    10
}

fn default_enemy_min() -> u32 {
    11
}

fn default_enemy_max() -> u32 {
    111
}

fn default_enemy_kind() -> String {
    "melee".to_string()
}

fn default_enemy_name() -> String {
    "Minotaur".to_string()
}

fn default_enemy_hp() -> f32 {
    100.0
}

fn default_enemy_damage() -> f32 {
    10.0
}

fn default_enemy_texture() -> TextureData {
    TextureData {
        tile_id: 0,
        tile_set: "minotaur".to_string(),
        tile_layer: 3,
    }
}

fn default_enemy_collision() -> CollisionData {
    CollisionData {
        kind: 1,
        width: 16.0,
        height: 16.0,
        x_offset: 0.0,
        y_offset: 0.0,
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_players: default_max_players(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            scaling_factor: default_scaling_factor(),
            collision_padding: default_collision_padding(),
            tile_cells: default_tile_cells(),
            enemy_footprint: default_enemy_footprint(),
            restrict_to_region: default_restrict_to_region(),
            max_cells: default_max_cells(),
        }
    }
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            player_min: default_player_min(),
            player_max: default_player_max(),
            enemy_min: default_enemy_min(),
            enemy_max: default_enemy_max(),
        }
    }
}

impl Default for EnemyArchetype {
    fn default() -> Self {
        Self {
            kind: default_enemy_kind(),
            name: default_enemy_name(),
            hp: default_enemy_hp(),
            damage: default_enemy_damage(),
            texture: default_enemy_texture(),
            collision: default_enemy_collision(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            world: WorldConfig::default(),
            ids: IdConfig::default(),
            enemies: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or use defaults if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config = Self::from_toml(&contents)?;
                info!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No {} found, using default configuration", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// First configured archetype, or the built-in melee enemy.
    pub fn archetype(&self) -> EnemyArchetype {
        self.enemies.first().cloned().unwrap_or_default()
    }

    pub fn field_settings(&self) -> FieldSettings {
        FieldSettings {
            collision_padding: self.world.collision_padding,
            corner_probe: CornerProbe {
                footprint: self.world.enemy_footprint,
                tile: self.world.tile_cells,
            },
            restrict_to_region: self.world.restrict_to_region,
            max_cells: self.world.max_cells,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.network.host, self.network.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.address(), "127.0.0.1:9001");
        assert_eq!(config.network.max_players, 8);
        assert_eq!(config.world.scaling_factor, 10);
        assert_eq!(config.ids.enemy_max, 111);
        assert_eq!(config.world.max_cells, DEFAULT_MAX_CELLS);
        assert_eq!(config.field_settings(), FieldSettings::default());
        assert_eq!(config.archetype(), EnemyArchetype::default());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [network]
            port = 9100

            [world]
            collision_padding = 1
            restrict_to_region = false
            max_cells = 2500

            [[enemies]]
            kind = "ranged"
            name = "Archer"
            hp = 40.0
            "#,
        )
        .unwrap();

        assert_eq!(config.network.port, 9100);
        assert_eq!(config.network.host, "127.0.0.1");
        let settings = config.field_settings();
        assert_eq!(settings.collision_padding, 1);
        assert!(!settings.restrict_to_region);
        assert_eq!(settings.max_cells, 2500);
        assert_eq!(settings.corner_probe, CornerProbe::default());

        let archetype = config.archetype();
        assert_eq!(archetype.kind, "ranged");
        assert_eq!(archetype.damage, 10.0);
        assert_eq!(archetype.texture.tile_set, "minotaur");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let result = Config::from_toml("[world]\nscaling_factor = \"ten\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::load(Path::new("definitely/not/here/server.toml")).unwrap();
        assert_eq!(config.network.port, DEFAULT_PORT);
    }
}
