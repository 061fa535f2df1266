use crate::config::EnemyArchetype;
use crate::flow_field::{Coordinate, Direction, Steerable};
use crate::utils::{to_cells, to_pixels};
use shared::{EnemyDirection, EnemySpawn};

// Enemy representation, position in grid cells
#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub id: u32,
    pub position: Coordinate,
    pub direction: Direction,
    pub archetype: EnemyArchetype,
}

impl Enemy {
    pub fn new(id: u32, position: Coordinate, archetype: EnemyArchetype) -> Self {
        Enemy {
            id,
            position,
            direction: Direction::ZERO,
            archetype,
        }
    }

    // Build from a client spawn request given in pixels
    pub fn from_request(id: u32, request: &EnemySpawn, archetype: EnemyArchetype, scale: i32) -> Self {
        let position = Coordinate::new(to_cells(request.x, scale), to_cells(request.y, scale));
        Self::new(id, position, archetype)
    }

    // Wire form with the position scaled back to pixels
    pub fn to_spawn(&self, scale: i32) -> EnemySpawn {
        EnemySpawn {
            id: self.id,
            x: to_pixels(self.position.x, scale),
            y: to_pixels(self.position.y, scale),
            kind: self.archetype.kind.clone(),
            name: self.archetype.name.clone(),
            hp: self.archetype.hp,
            damage: self.archetype.damage,
            texture: self.archetype.texture.clone(),
            collision: self.archetype.collision.clone(),
        }
    }

    pub fn to_wire_direction(&self) -> EnemyDirection {
        EnemyDirection {
            id: self.id,
            x: self.direction.x,
            y: self.direction.y,
        }
    }
}

impl Steerable for Enemy {
    fn position(&self) -> Coordinate {
        self.position
    }

    fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }
}
