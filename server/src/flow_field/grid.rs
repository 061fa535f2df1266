//! Cell storage for one room.

use super::{Coordinate, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellKind {
    #[default]
    Normal,
    Source,
    Obstacle,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cell {
    pub distance: u32,
    pub direction: Option<Direction>,
    pub kind: CellKind,
    /// Set once BFS has reached the cell during the current tick.
    pub visited: bool,
}

impl Cell {
    /// Resets the per-tick fields. Obstacles stay obstacles.
    fn reset(&mut self) {
        self.distance = 0;
        self.direction = None;
        self.visited = false;
        if self.kind == CellKind::Source {
            self.kind = CellKind::Normal;
        }
    }
}

/// The four axis neighbors of a cell, each clamped into the grid. At the
/// border a neighbor degenerates to the cell itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbors {
    pub up: Coordinate,
    pub down: Coordinate,
    pub left: Coordinate,
    pub right: Coordinate,
}

impl Neighbors {
    pub fn all(&self) -> [Coordinate; 4] {
        [self.up, self.down, self.left, self.right]
    }
}

/// Row-major `height × width` cell buffer.
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, at: Coordinate) -> bool {
        at.x >= 0 && at.y >= 0 && (at.x as usize) < self.width && (at.y as usize) < self.height
    }

    fn index(&self, at: Coordinate) -> Option<usize> {
        if self.contains(at) {
            Some(at.y as usize * self.width + at.x as usize)
        } else {
            None
        }
    }

    pub fn get(&self, at: Coordinate) -> Option<&Cell> {
        self.index(at).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, at: Coordinate) -> Option<&mut Cell> {
        self.index(at).map(move |i| &mut self.cells[i])
    }

    pub fn kind(&self, at: Coordinate) -> Option<CellKind> {
        self.get(at).map(|cell| cell.kind)
    }

    pub fn distance(&self, at: Coordinate) -> Option<u32> {
        self.get(at).map(|cell| cell.distance)
    }

    pub fn direction(&self, at: Coordinate) -> Option<Direction> {
        self.get(at).and_then(|cell| cell.direction)
    }

    /// Cells outside the grid are not obstacles.
    pub fn is_obstacle(&self, at: Coordinate) -> bool {
        self.kind(at) == Some(CellKind::Obstacle)
    }

    pub fn obstacle_count(&self) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.kind == CellKind::Obstacle)
            .count()
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.reset();
        }
    }

    /// Marks a player cell as a BFS source. Returns false (and does nothing)
    /// when the cell is outside the grid or an obstacle.
    pub fn stamp_source(&mut self, at: Coordinate) -> bool {
        match self.get_mut(at) {
            Some(cell) if cell.kind != CellKind::Obstacle => {
                cell.kind = CellKind::Source;
                cell.distance = 0;
                cell.direction = None;
                cell.visited = true;
                true
            }
            _ => false,
        }
    }

    /// Returns false when the cell is outside the grid.
    pub fn stamp_obstacle(&mut self, at: Coordinate) -> bool {
        match self.get_mut(at) {
            Some(cell) => {
                *cell = Cell {
                    kind: CellKind::Obstacle,
                    ..Cell::default()
                };
                true
            }
            None => false,
        }
    }

    /// Clamps `at` into the grid.
    pub fn clamp_neighbor(&self, at: Coordinate) -> Coordinate {
        let max_x = self.width.saturating_sub(1) as i32;
        let max_y = self.height.saturating_sub(1) as i32;
        Coordinate::new(at.x.clamp(0, max_x), at.y.clamp(0, max_y))
    }

    pub fn neighbors(&self, at: Coordinate) -> Neighbors {
        Neighbors {
            up: self.clamp_neighbor(at.offset(0, -1)),
            down: self.clamp_neighbor(at.offset(0, 1)),
            left: self.clamp_neighbor(at.offset(-1, 0)),
            right: self.clamp_neighbor(at.offset(1, 0)),
        }
    }

    /// All coordinates in row-major order.
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| Coordinate::new(x, y)))
    }
}
