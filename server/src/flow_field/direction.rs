//! Direction field derived from the distance field, plus the read-time
//! corner correction applied to enemies.

use super::bounds::RegionBounds;
use super::grid::{CellKind, Grid};
use super::{Coordinate, Direction};

/// Assigns a direction to every reached, non-source, non-obstacle cell in
/// `region`. Returns the number of cells assigned.
pub fn build_directions(grid: &mut Grid, region: &RegionBounds) -> usize {
    let mut assigned = 0;

    for at in region.coordinates() {
        let eligible = grid
            .get(at)
            .map_or(false, |cell| cell.visited && cell.kind == CellKind::Normal);
        if !eligible {
            continue;
        }

        let direction = cell_direction(grid, at);
        if let Some(cell) = grid.get_mut(at) {
            cell.direction = Some(direction);
            assigned += 1;
        }
    }

    assigned
}

/// Discrete gradient of the distance field at `at`, pointing toward lower
/// distances. Positive x is `x + 1`, positive y is `y + 1`.
pub fn cell_direction(grid: &Grid, at: Coordinate) -> Direction {
    let here = i64::from(grid.distance(at).unwrap_or(0));
    let neighbors = grid.neighbors(at);

    let dx = axis_delta(grid, here, neighbors.left, neighbors.right);
    let dy = axis_delta(grid, here, neighbors.up, neighbors.down);

    Direction::from_delta(dx, dy)
}

/// `low` is the neighbor on the decreasing side of the axis, `high` the one
/// on the increasing side.
fn axis_delta(grid: &Grid, here: i64, low: Coordinate, high: Coordinate) -> i64 {
    let distance = |at: Coordinate| i64::from(grid.distance(at).unwrap_or(0));

    match (grid.is_obstacle(low), grid.is_obstacle(high)) {
        (true, true) => 0,
        // one-sided estimates, biased away from the blocked side
        (true, false) => here - distance(high) + 1,
        (false, true) => distance(low) - here - 1,
        (false, false) => distance(low) - distance(high),
    }
}

/// Parameters of the read-time wall-hugging fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerProbe {
    /// Enemy size in cells; the probe looks just past its far edge.
    pub footprint: i32,
    /// Sub-tile modulus. An enemy aligned to a tile boundary is never corrected.
    pub tile: i32,
}

impl Default for CornerProbe {
    fn default() -> Self {
        Self {
            footprint: 3,
            tile: 16,
        }
    }
}

impl CornerProbe {
    /// Replaces a pure axis move with the perpendicular one when the
    /// diagonal cell ahead is an obstacle and the enemy is not tile-aligned
    /// on the perpendicular axis. The grid is never written.
    pub fn correct(&self, grid: &Grid, at: Coordinate, raw: Direction) -> Direction {
        let misaligned = |v: i32| self.tile > 0 && v.rem_euclid(self.tile) > 0;
        let f = self.footprint;

        let (probe, misaligned_axis, steer) = if raw == Direction::LEFT {
            (at.offset(-1, f), at.y, Direction::UP)
        } else if raw == Direction::UP {
            (at.offset(f, -1), at.x, Direction::LEFT)
        } else if raw == Direction::RIGHT {
            (at.offset(f, f), at.y, Direction::UP)
        } else if raw == Direction::DOWN {
            (at.offset(f, f), at.x, Direction::LEFT)
        } else {
            return raw;
        };

        if grid.is_obstacle(probe) && misaligned(misaligned_axis) {
            steer
        } else {
            raw
        }
    }
}
