//! Per-room flow field and its per-tick lifecycle.

use super::bounds::RegionBounds;
use super::collision;
use super::debug::render_field;
use super::direction::{build_directions, CornerProbe};
use super::distance::build_distances;
use super::grid::{CellKind, Grid};
use super::{Coordinate, Direction, FlowFieldError, Steerable};
use log::{debug, info, log_enabled, Level};
use std::collections::HashMap;

/// 2048 x 2048 cells.
pub const DEFAULT_MAX_CELLS: usize = 1 << 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSettings {
    /// Cells added around every obstacle at allocation.
    pub collision_padding: i32,
    pub corner_probe: CornerProbe,
    /// Only derive directions inside the box around players and enemies.
    pub restrict_to_region: bool,
    /// Largest grid `allocate` accepts, in cells.
    pub max_cells: usize,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            collision_padding: 2,
            corner_probe: CornerProbe::default(),
            restrict_to_region: true,
            max_cells: DEFAULT_MAX_CELLS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    GridReady,
    DistancesBuilt,
    DirectionsBuilt,
}

/// What one build pass touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub region: Option<RegionBounds>,
    /// Cells reached by BFS, sources included.
    pub reached: usize,
    /// Cells given a direction.
    pub directed: usize,
    /// Enemies that received a direction.
    pub steered: usize,
}

/// Flow field engine for a single room.
///
/// Inputs are snapshots in scaled room coordinates; the engine subtracts its
/// room offset to address the grid. Cell accessors take grid coordinates.
#[derive(Debug)]
pub struct FlowField {
    settings: FieldSettings,
    grid: Option<Grid>,
    offset: Coordinate,
    obstacles: Vec<Coordinate>,
    players: HashMap<u32, Coordinate>,
    enemies: HashMap<u32, Coordinate>,
    region: Option<RegionBounds>,
    state: Lifecycle,
    dump_next_build: bool,
}

impl Default for FlowField {
    fn default() -> Self {
        Self::new(FieldSettings::default())
    }
}

impl FlowField {
    pub fn new(settings: FieldSettings) -> Self {
        Self {
            settings,
            grid: None,
            offset: Coordinate::default(),
            obstacles: Vec::new(),
            players: HashMap::new(),
            enemies: HashMap::new(),
            region: None,
            state: Lifecycle::Uninitialized,
            dump_next_build: false,
        }
    }

    pub fn settings(&self) -> &FieldSettings {
        &self.settings
    }

    pub fn state(&self) -> Lifecycle {
        self.state
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn offset(&self) -> Coordinate {
        self.offset
    }

    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.grid.as_ref().map(|grid| (grid.width(), grid.height()))
    }

    /// Region used by the last build.
    pub fn region(&self) -> Option<RegionBounds> {
        self.region
    }

    /// Raw obstacle tiles of the room. Applied by the next `allocate`.
    pub fn set_obstacles(&mut self, obstacles: Vec<Coordinate>) {
        self.obstacles = obstacles;
    }

    pub fn set_players(&mut self, players: HashMap<u32, Coordinate>) {
        self.players = players;
    }

    pub fn set_enemies(&mut self, enemies: HashMap<u32, Coordinate>) {
        self.enemies = enemies;
    }

    /// Discards the previous grid and builds a cleared one with the expanded
    /// obstacles stamped in. Valid from any state. A grid wider or taller than
    /// `i32::MAX`, or with more than `max_cells` cells, is rejected before
    /// anything is allocated and the previous grid stays in place.
    pub fn allocate(
        &mut self,
        width: usize,
        height: usize,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<(), FlowFieldError> {
        let too_wide = width > i32::MAX as usize || height > i32::MAX as usize;
        let cells = width.checked_mul(height).unwrap_or(usize::MAX);
        if cells == 0 || too_wide || cells > self.settings.max_cells {
            return Err(FlowFieldError::InvalidDimensions { width, height });
        }

        let offset = Coordinate::new(offset_x, offset_y);
        let mut grid = Grid::new(width, height);
        let expanded = collision::expand(&self.obstacles, self.settings.collision_padding);
        let stamped = expanded
            .iter()
            .filter(|at| grid.stamp_obstacle(at.minus(offset)))
            .count();

        info!(
            "Created flow field grid {}x{} at offset ({}, {}): {} obstacles, {} of {} padded cells inside",
            width,
            height,
            offset_x,
            offset_y,
            self.obstacles.len(),
            stamped,
            expanded.len()
        );

        self.grid = Some(grid);
        self.offset = offset;
        self.region = None;
        self.state = Lifecycle::GridReady;
        self.dump_next_build = true;

        if log_enabled!(Level::Debug) {
            if let Some(grid) = self.grid.as_ref() {
                debug!("Obstacle layout:\n{}", render_field(grid, &[]));
            }
        }
        Ok(())
    }

    fn to_grid(&self, at: Coordinate) -> Coordinate {
        at.minus(self.offset)
    }

    /// Seeds the players, bounds the region and builds distances and
    /// directions. Leaves the fields in place for inspection until `clear`.
    pub fn build(&mut self) -> Result<TickReport, FlowFieldError> {
        if self.grid.is_none() {
            return Err(FlowFieldError::NotAllocated);
        }
        if self.state != Lifecycle::GridReady {
            self.clear();
        }

        let mut player_ids: Vec<&u32> = self.players.keys().collect();
        player_ids.sort();
        let sources: Vec<Coordinate> = player_ids
            .into_iter()
            .map(|id| self.to_grid(self.players[id]))
            .collect();
        let entities: Vec<Coordinate> = sources
            .iter()
            .copied()
            .chain(self.enemies.values().map(|at| self.to_grid(*at)))
            .collect();

        let restrict = self.settings.restrict_to_region;
        let Some(grid) = self.grid.as_mut() else {
            return Err(FlowFieldError::NotAllocated);
        };

        let region = if restrict {
            RegionBounds::enclosing(entities, grid.width(), grid.height())
        } else {
            RegionBounds::full(grid.width(), grid.height())
        };

        let reached = match build_distances(grid, sources) {
            Ok(reached) => reached,
            Err(e) => {
                grid.clear();
                self.state = Lifecycle::GridReady;
                return Err(e);
            }
        };
        self.state = Lifecycle::DistancesBuilt;

        let directed = region.map_or(0, |region| build_directions(grid, &region));
        self.state = Lifecycle::DirectionsBuilt;
        self.region = region;

        Ok(TickReport {
            region,
            reached,
            directed,
            steered: 0,
        })
    }

    /// Hands every enemy the corner-corrected direction of its cell. An enemy
    /// standing on a player's cell is stopped. Enemies outside the grid or on
    /// a cell without a direction keep their old one.
    pub fn steer<E: Steerable>(&self, enemies: &mut HashMap<u32, E>) -> usize {
        let Some(grid) = self.grid.as_ref() else {
            return 0;
        };
        if self.state != Lifecycle::DirectionsBuilt {
            return 0;
        }

        let mut steered = 0;
        for enemy in enemies.values_mut() {
            let at = self.to_grid(enemy.position());
            if grid.kind(at) == Some(CellKind::Source) {
                enemy.set_direction(Direction::ZERO);
                steered += 1;
            } else if let Some(raw) = grid.direction(at) {
                enemy.set_direction(self.settings.corner_probe.correct(grid, at, raw));
                steered += 1;
            }
        }
        steered
    }

    /// The full tick: build, steer, clear. The grid is cleared even when the
    /// build fails, in which case no enemy is touched.
    pub fn recompute<E: Steerable>(
        &mut self,
        enemies: &mut HashMap<u32, E>,
    ) -> Result<TickReport, FlowFieldError> {
        self.set_enemies(
            enemies
                .iter()
                .map(|(id, enemy)| (*id, enemy.position()))
                .collect(),
        );

        let outcome = self.build().map(|mut report| {
            report.steered = self.steer(enemies);
            report
        });

        if outcome.is_ok() && self.dump_next_build && log_enabled!(Level::Debug) {
            let positions: Vec<Coordinate> =
                self.enemies.values().map(|at| self.to_grid(*at)).collect();
            if let Some(grid) = self.grid.as_ref() {
                debug!("First flow field after allocation:\n{}", render_field(grid, &positions));
            }
            self.dump_next_build = false;
        }

        self.clear();
        outcome
    }

    /// Drops distances, directions and sources; obstacles stay.
    pub fn clear(&mut self) {
        if let Some(grid) = self.grid.as_mut() {
            grid.clear();
            self.state = Lifecycle::GridReady;
        }
    }

    pub fn distance(&self, at: Coordinate) -> Option<u32> {
        self.grid.as_ref().and_then(|grid| grid.distance(at))
    }

    pub fn direction(&self, at: Coordinate) -> Option<Direction> {
        self.grid.as_ref().and_then(|grid| grid.direction(at))
    }

    pub fn kind(&self, at: Coordinate) -> Option<CellKind> {
        self.grid.as_ref().and_then(|grid| grid.kind(at))
    }
}
