//! Flow-field steering for enemies.
//!
//! Obstacles are stamped once per room into a [`Grid`]. Every map update the
//! players become BFS sources, each reachable cell gets a hop distance and a
//! direction pointing down the distance gradient, and each enemy is handed the
//! direction of the cell it stands on.
//!
//! The pipeline lives in [`FlowField`]; [`FlowFieldHandle`] shares one engine
//! between network tasks and serializes recomputes.

pub mod bounds;
pub mod collision;
pub mod debug;
pub mod direction;
pub mod distance;
pub mod engine;
pub mod grid;
pub mod handle;

pub use bounds::RegionBounds;
pub use engine::{FieldSettings, FlowField, Lifecycle, TickReport};
pub use grid::{Cell, CellKind, Grid};
pub use handle::{FlowFieldHandle, Recompute};

use crate::utils::normalize_vector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowFieldError {
    #[error("flow field has no grid; map dimensions were never received")]
    NotAllocated,
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    #[error("BFS frontier popped while empty")]
    EmptyQueue,
    #[error("flow field lock poisoned by a panicked recompute")]
    Poisoned,
}

/// Integer cell position. `x` is the column, `y` the row; `y - 1` is up.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub const fn minus(self, other: Coordinate) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

/// Steering vector. Always either zero or unit length.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Direction {
    pub x: f32,
    pub y: f32,
}

impl Direction {
    pub const ZERO: Direction = Direction { x: 0.0, y: 0.0 };
    pub const UP: Direction = Direction { x: 0.0, y: -1.0 };
    pub const DOWN: Direction = Direction { x: 0.0, y: 1.0 };
    pub const LEFT: Direction = Direction { x: -1.0, y: 0.0 };
    pub const RIGHT: Direction = Direction { x: 1.0, y: 0.0 };

    /// Normalizes an integer delta; a zero delta stays zero.
    pub fn from_delta(dx: i64, dy: i64) -> Self {
        let (x, y) = normalize_vector(dx as f32, dy as f32);
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// An entity the engine can steer: it exposes where it stands and accepts
/// a new direction. Positions are in scaled room coordinates, before the
/// grid offset is applied.
pub trait Steerable {
    fn position(&self) -> Coordinate;
    fn set_direction(&mut self, direction: Direction);
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_direction_from_delta_normalizes() {
        let direction = Direction::from_delta(3, -4);
        assert_approx_eq!(direction.x, 0.6, 1e-6);
        assert_approx_eq!(direction.y, -0.8, 1e-6);
        assert_approx_eq!(direction.length(), 1.0, 1e-6);
    }

    #[test]
    fn test_direction_zero_delta_stays_zero() {
        let direction = Direction::from_delta(0, 0);
        assert!(direction.is_zero());
        assert_eq!(direction, Direction::ZERO);
    }

    #[test]
    fn test_axis_delta_is_exact_cardinal() {
        assert_eq!(Direction::from_delta(-7, 0), Direction::LEFT);
        assert_eq!(Direction::from_delta(0, 2), Direction::DOWN);
    }

    #[test]
    fn test_coordinate_arithmetic() {
        let c = Coordinate::new(4, 9);
        assert_eq!(c.offset(-1, 3), Coordinate::new(3, 12));
        assert_eq!(c.minus(Coordinate::new(4, 4)), Coordinate::new(0, 5));
    }
}
