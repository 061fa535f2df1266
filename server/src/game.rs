use crate::config::EnemyArchetype;
use crate::enemy::Enemy;
use crate::flow_field::{Coordinate, Direction};
use crate::id_pool::IdPool;
use crate::utils::{generate_seed, to_cells};
use log::{debug, info, warn};
use shared::{EnemyDirection, EnemySpawn, EntityPosition, MapDimensions};
use std::collections::HashMap;

/// Grid placement of a room, handed to the flow field on allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapLayout {
    pub width: usize,
    pub height: usize,
    pub offset: Coordinate,
    pub obstacles: Vec<Coordinate>,
}

/// Room state as seen by the server. Positions are in grid cells.
#[derive(Debug, Clone)]
pub struct GameState {
    pub players: HashMap<u32, Coordinate>,
    pub enemies: HashMap<u32, Enemy>,
    pub obstacles: Vec<Coordinate>,
    pub map_ready: bool,
    pub enemies_spawned: bool,
    pub room: u32,
    pub seed: i64,
    /// Bumped on every room change, including re-entering the same room.
    epoch: u64,
    scale: i32,
    enemy_ids: IdPool,
}

impl GameState {
    pub fn new(scale: i32, enemy_ids: IdPool) -> Self {
        Self::with_seed(scale, enemy_ids, generate_seed())
    }

    pub fn with_seed(scale: i32, enemy_ids: IdPool, seed: i64) -> Self {
        Self {
            players: HashMap::new(),
            enemies: HashMap::new(),
            obstacles: Vec::new(),
            map_ready: false,
            enemies_spawned: false,
            room: 0,
            seed,
            epoch: 0,
            scale,
            enemy_ids,
        }
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replaces the room's obstacles with the pixel layout in `map`.
    ///
    /// The grid spans from the smallest to the largest obstacle cell on each
    /// axis, so a bordered room maps exactly onto its walls. Returns None and
    /// leaves the state untouched when the layout has no obstacles.
    pub fn apply_map_dimensions(&mut self, map: &MapDimensions) -> Option<MapLayout> {
        let obstacles: Vec<Coordinate> = map
            .obstacles
            .iter()
            .map(|o| Coordinate::new(to_cells(o.left, self.scale), to_cells(o.top, self.scale)))
            .collect();

        let first = *obstacles.first()?;
        let (mut min, mut max) = (first, first);
        for at in &obstacles {
            min = Coordinate::new(min.x.min(at.x), min.y.min(at.y));
            max = Coordinate::new(max.x.max(at.x), max.y.max(at.y));
        }

        let layout = MapLayout {
            width: (max.x - min.x) as usize + 1,
            height: (max.y - min.y) as usize + 1,
            offset: min,
            obstacles: obstacles.clone(),
        };

        info!(
            "Map dimensions received: {} obstacles, {}x{} cells at ({}, {})",
            obstacles.len(),
            layout.width,
            layout.height,
            min.x,
            min.y
        );

        self.obstacles = obstacles;
        self.map_ready = true;
        Some(layout)
    }

    /// Forgets everything tied to the current room.
    pub fn change_room(&mut self, room: u32) {
        for id in self.enemies.keys() {
            self.enemy_ids.return_id(*id);
        }
        self.enemies.clear();
        self.players.clear();
        self.obstacles.clear();
        self.map_ready = false;
        self.enemies_spawned = false;
        self.room = room;
        self.epoch += 1;
        info!("Changed to room {}", room);
    }

    /// Spawns the requested enemies once per room. Returns the new ids.
    pub fn spawn_enemies(&mut self, requests: &[EnemySpawn], archetype: &EnemyArchetype) -> Vec<u32> {
        if self.enemies_spawned {
            debug!("Enemies already spawned in room {}; ignoring request", self.room);
            return Vec::new();
        }

        let mut spawned = Vec::with_capacity(requests.len());
        for request in requests {
            let Some(id) = self.enemy_ids.get_id() else {
                warn!("Out of enemy ids; spawned {} of {}", spawned.len(), requests.len());
                break;
            };
            let enemy = Enemy::from_request(id, request, archetype.clone(), self.scale);
            self.enemies.insert(id, enemy);
            spawned.push(id);
        }

        self.enemies_spawned = true;
        info!("Spawned {} enemies in room {}", spawned.len(), self.room);
        spawned
    }

    pub fn spawned_enemies(&self) -> Vec<EnemySpawn> {
        let mut spawns: Vec<EnemySpawn> = self
            .enemies
            .values()
            .map(|enemy| enemy.to_spawn(self.scale))
            .collect();
        spawns.sort_by_key(|spawn| spawn.id);
        spawns
    }

    /// Refreshes positions from a client report given in pixels. Unknown
    /// enemies are ignored; unknown players are added.
    pub fn apply_map_update(&mut self, players: &[EntityPosition], enemies: &[EntityPosition]) {
        for player in players {
            let at = Coordinate::new(to_cells(player.x, self.scale), to_cells(player.y, self.scale));
            self.players.insert(player.id, at);
        }
        for reported in enemies {
            if let Some(enemy) = self.enemies.get_mut(&reported.id) {
                enemy.position =
                    Coordinate::new(to_cells(reported.x, self.scale), to_cells(reported.y, self.scale));
            }
        }
    }

    /// Copies handed to the flow field so the live state stays unlocked.
    pub fn snapshot(&self) -> (HashMap<u32, Coordinate>, HashMap<u32, Enemy>) {
        (self.players.clone(), self.enemies.clone())
    }

    /// Writes back directions computed on a snapshot. Enemies removed in the
    /// meantime are skipped.
    pub fn apply_directions(&mut self, directions: &HashMap<u32, Direction>) -> usize {
        let mut applied = 0;
        for (id, direction) in directions {
            if let Some(enemy) = self.enemies.get_mut(id) {
                enemy.direction = *direction;
                applied += 1;
            }
        }
        applied
    }

    pub fn enemy_directions(&self) -> Vec<EnemyDirection> {
        let mut directions: Vec<EnemyDirection> =
            self.enemies.values().map(Enemy::to_wire_direction).collect();
        directions.sort_by_key(|direction| direction.id);
        directions
    }

    pub fn remove_player(&mut self, id: &u32) {
        if self.players.remove(id).is_some() {
            info!("Removed player {}", id);
        }
    }
}
