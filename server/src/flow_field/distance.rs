//! Multi-source breadth-first distance field.

use super::grid::{CellKind, Grid};
use super::{Coordinate, FlowFieldError};
use std::collections::VecDeque;

/// FIFO of cells waiting to be expanded.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<Coordinate>,
}

impl Frontier {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
        }
    }

    pub fn put(&mut self, at: Coordinate) {
        self.queue.push_back(at);
    }

    /// Popping an empty frontier means the caller's loop is broken.
    pub fn get(&mut self) -> Result<Coordinate, FlowFieldError> {
        self.queue.pop_front().ok_or(FlowFieldError::EmptyQueue)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Stamps every source and floods the grid outward from all of them at once.
///
/// Sources outside the grid or on obstacles are dropped. A cell is assigned
/// `max(current + 1, recorded)` the first time it is reached and never
/// revisited; since unvisited cells always hold 0 that is the hop count to
/// the nearest source. Returns the number of cells reached, sources included.
pub fn build_distances<I>(grid: &mut Grid, sources: I) -> Result<usize, FlowFieldError>
where
    I: IntoIterator<Item = Coordinate>,
{
    let mut frontier = Frontier::with_capacity(grid.width() * grid.height());
    let mut reached = 0;

    for source in sources {
        let already_seeded = grid.get(source).map_or(false, |cell| cell.visited);
        if !already_seeded && grid.stamp_source(source) {
            frontier.put(source);
            reached += 1;
        }
    }

    while !frontier.is_empty() {
        let current = frontier.get()?;
        let next_distance = match grid.distance(current) {
            Some(distance) => distance + 1,
            None => continue,
        };

        for next in grid.neighbors(current).all() {
            let Some(cell) = grid.get_mut(next) else {
                continue;
            };
            if cell.visited || cell.kind == CellKind::Obstacle {
                continue;
            }

            cell.visited = true;
            cell.distance = cell.distance.max(next_distance);
            frontier.put(next);
            reached += 1;
        }
    }

    Ok(reached)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(grid: &Grid, x: i32, y: i32) -> u32 {
        grid.distance(Coordinate::new(x, y)).unwrap()
    }

    #[test]
    fn test_empty_frontier_reports_invariant_violation() {
        let mut frontier = Frontier::default();
        assert_eq!(frontier.get(), Err(FlowFieldError::EmptyQueue));

        frontier.put(Coordinate::new(1, 1));
        assert_eq!(frontier.len(), 1);
        assert_eq!(frontier.get(), Ok(Coordinate::new(1, 1)));
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_single_source_manhattan_distances() {
        let mut grid = Grid::new(5, 5);
        let reached = build_distances(&mut grid, [Coordinate::new(2, 2)]).unwrap();

        assert_eq!(reached, 25);
        assert_eq!(d(&grid, 2, 2), 0);
        assert_eq!(grid.kind(Coordinate::new(2, 2)), Some(CellKind::Source));
        assert_eq!(d(&grid, 0, 0), 4);
        assert_eq!(d(&grid, 4, 2), 2);
        assert_eq!(d(&grid, 3, 4), 3);
    }

    #[test]
    fn test_two_sources_take_nearest() {
        let mut grid = Grid::new(5, 5);
        build_distances(&mut grid, [Coordinate::new(1, 4), Coordinate::new(4, 4)]).unwrap();

        assert_eq!(d(&grid, 0, 0), 5);
        assert_eq!(d(&grid, 4, 0), 4);
        assert_eq!(d(&grid, 2, 4), 1);
        assert_eq!(d(&grid, 3, 4), 1);
    }

    #[test]
    fn test_obstacles_block_and_keep_distance_zero() {
        let mut grid = Grid::new(5, 3);
        // vertical wall at x = 2 with a gap at the bottom
        grid.stamp_obstacle(Coordinate::new(2, 0));
        grid.stamp_obstacle(Coordinate::new(2, 1));

        build_distances(&mut grid, [Coordinate::new(0, 0)]).unwrap();

        assert_eq!(d(&grid, 2, 0), 0);
        assert!(!grid.get(Coordinate::new(2, 0)).unwrap().visited);
        // around the wall: down 2, right 3, up 0
        assert_eq!(d(&grid, 3, 2), 5);
        assert_eq!(d(&grid, 3, 0), 7);
    }

    #[test]
    fn test_unreachable_pocket_stays_unvisited() {
        let mut grid = Grid::new(5, 5);
        for at in [(3, 4), (4, 3), (3, 3)] {
            grid.stamp_obstacle(Coordinate::new(at.0, at.1));
        }

        let reached = build_distances(&mut grid, [Coordinate::new(0, 0)]).unwrap();

        let pocket = grid.get(Coordinate::new(4, 4)).unwrap();
        assert!(!pocket.visited);
        assert_eq!(pocket.distance, 0);
        assert_eq!(reached, 25 - 3 - 1);
    }

    #[test]
    fn test_invalid_sources_are_dropped() {
        let mut grid = Grid::new(3, 3);
        grid.stamp_obstacle(Coordinate::new(1, 1));

        let reached = build_distances(
            &mut grid,
            [Coordinate::new(-1, 0), Coordinate::new(1, 1), Coordinate::new(3, 3)],
        )
        .unwrap();

        assert_eq!(reached, 0);
        assert!(grid.coordinates().all(|at| !grid.get(at).unwrap().visited));
    }

    #[test]
    fn test_duplicate_sources_seed_once() {
        let mut grid = Grid::new(2, 1);
        let reached =
            build_distances(&mut grid, [Coordinate::new(0, 0), Coordinate::new(0, 0)]).unwrap();

        assert_eq!(reached, 2);
        assert_eq!(d(&grid, 1, 0), 1);
    }
}
