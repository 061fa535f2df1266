use super::engine::{FieldSettings, FlowField, TickReport};
use super::{Coordinate, FlowFieldError, Steerable};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, TryLockError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recompute {
    Completed(TickReport),
    /// Another recompute held the engine; this tick was dropped.
    Skipped,
}

/// Shared access to one room's engine.
///
/// Allocation waits for the lock. Recomputes never wait: if one is already
/// running the new request is skipped rather than queued.
#[derive(Debug, Clone)]
pub struct FlowFieldHandle {
    inner: Arc<Mutex<FlowField>>,
}

impl FlowFieldHandle {
    pub fn new(settings: FieldSettings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FlowField::new(settings))),
        }
    }

    /// Replaces the obstacle set and rebuilds the grid.
    pub fn allocate(
        &self,
        obstacles: Vec<Coordinate>,
        width: usize,
        height: usize,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<(), FlowFieldError> {
        let mut field = self.inner.lock().map_err(|_| FlowFieldError::Poisoned)?;
        field.set_obstacles(obstacles);
        field.allocate(width, height, offset_x, offset_y)
    }

    pub fn try_recompute<E: Steerable>(
        &self,
        players: HashMap<u32, Coordinate>,
        enemies: &mut HashMap<u32, E>,
    ) -> Result<Recompute, FlowFieldError> {
        let mut field = match self.inner.try_lock() {
            Ok(field) => field,
            Err(TryLockError::WouldBlock) => {
                debug!("Flow field busy; skipping recompute");
                return Ok(Recompute::Skipped);
            }
            Err(TryLockError::Poisoned(_)) => return Err(FlowFieldError::Poisoned),
        };

        field.set_players(players);
        field.recompute(enemies).map(Recompute::Completed)
    }

    /// Runs `f` with the engine locked.
    pub fn with_field<T>(&self, f: impl FnOnce(&mut FlowField) -> T) -> Result<T, FlowFieldError> {
        let mut field = self.inner.lock().map_err(|_| FlowFieldError::Poisoned)?;
        Ok(f(&mut field))
    }
}

impl Default for FlowFieldHandle {
    fn default() -> Self {
        Self::new(FieldSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow_field::{Direction, Lifecycle};

    struct Dummy {
        at: Coordinate,
        direction: Direction,
    }

    impl Steerable for Dummy {
        fn position(&self) -> Coordinate {
            self.at
        }

        fn set_direction(&mut self, direction: Direction) {
            self.direction = direction;
        }
    }

    fn enemies_at(x: i32, y: i32) -> HashMap<u32, Dummy> {
        let mut enemies = HashMap::new();
        enemies.insert(
            11,
            Dummy {
                at: Coordinate::new(x, y),
                direction: Direction::ZERO,
            },
        );
        enemies
    }

    #[test]
    fn test_recompute_through_handle() {
        let handle = FlowFieldHandle::new(FieldSettings {
            collision_padding: 0,
            ..FieldSettings::default()
        });
        handle.allocate(Vec::new(), 6, 6, 0, 0).unwrap();

        let mut enemies = enemies_at(2, 1);
        let players = HashMap::from([(1, Coordinate::new(2, 5))]);
        let outcome = handle.try_recompute(players, &mut enemies).unwrap();

        assert!(matches!(outcome, Recompute::Completed(report) if report.steered == 1));
        assert_eq!(enemies[&11].direction, Direction::DOWN);
        let state = handle.with_field(|field| field.state()).unwrap();
        assert_eq!(state, Lifecycle::GridReady);
    }

    #[test]
    fn test_busy_engine_skips_recompute() {
        let handle = FlowFieldHandle::default();
        handle.allocate(Vec::new(), 4, 4, 0, 0).unwrap();
        let other = handle.clone();

        let outcome = handle
            .with_field(|_| {
                let mut enemies = enemies_at(0, 0);
                other.try_recompute(HashMap::new(), &mut enemies)
            })
            .unwrap();

        assert_eq!(outcome, Ok(Recompute::Skipped));
    }

    #[test]
    fn test_oversized_allocation_leaves_handle_usable() {
        let handle = FlowFieldHandle::default();
        let huge = i32::MAX as usize;
        assert_eq!(
            handle.allocate(Vec::new(), huge, huge, 0, 0),
            Err(FlowFieldError::InvalidDimensions { width: huge, height: huge })
        );

        handle.allocate(Vec::new(), 5, 5, 0, 0).unwrap();
        let mut enemies = enemies_at(4, 2);
        let players = HashMap::from([(1, Coordinate::new(0, 2))]);
        let outcome = handle.try_recompute(players, &mut enemies).unwrap();

        assert!(matches!(outcome, Recompute::Completed(report) if report.steered == 1));
        assert_eq!(enemies[&11].direction, Direction::LEFT);
    }

    #[test]
    fn test_recompute_without_grid_errors() {
        let handle = FlowFieldHandle::default();
        let mut enemies = enemies_at(0, 0);
        assert_eq!(
            handle.try_recompute(HashMap::new(), &mut enemies),
            Err(FlowFieldError::NotAllocated)
        );
    }
}
