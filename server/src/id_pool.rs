//! Recycling id allocator for players and enemies.

use log::{error, warn};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Hands out ids from an inclusive range
///
/// Returned ids are reused smallest-first before any fresh id is issued.
#[derive(Debug, Clone)]
pub struct IdPool {
    min: u32,
    max: u32,
    /// Next id never handed out before
    next: u64,
    returned: BinaryHeap<Reverse<u32>>,
}

impl IdPool {
    pub fn new(min: u32, max: u32) -> Self {
        Self {
            min,
            max,
            next: u64::from(min),
            returned: BinaryHeap::new(),
        }
    }

    /// Returns None if every id in the range is in use
    pub fn get_id(&mut self) -> Option<u32> {
        if let Some(Reverse(id)) = self.returned.pop() {
            return Some(id);
        }
        if self.next > u64::from(self.max) {
            error!("Id pool {}..={} exhausted", self.min, self.max);
            return None;
        }
        let id = self.next as u32;
        self.next += 1;
        Some(id)
    }

    /// Puts an id back. Ids outside the range, never issued, or already
    /// returned are ignored.
    pub fn return_id(&mut self, id: u32) {
        if !self.contains(id) {
            warn!("Ignoring id {} outside pool {}..={}", id, self.min, self.max);
            return;
        }
        if !self.issued(id) || self.returned.iter().any(|Reverse(r)| *r == id) {
            warn!("Ignoring id {} that is not in use", id);
            return;
        }
        self.returned.push(Reverse(id));
    }

    pub fn contains(&self, id: u32) -> bool {
        (self.min..=self.max).contains(&id)
    }

    fn issued(&self, id: u32) -> bool {
        u64::from(id) < self.next
    }

    pub fn available(&self) -> usize {
        let fresh = (u64::from(self.max) + 1).saturating_sub(self.next);
        fresh as usize + self.returned.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_issued_in_order() {
        let mut pool = IdPool::new(1, 3);
        assert_eq!(pool.get_id(), Some(1));
        assert_eq!(pool.get_id(), Some(2));
        assert_eq!(pool.get_id(), Some(3));
        assert_eq!(pool.get_id(), None);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_smallest_returned_id_reused_first() {
        let mut pool = IdPool::new(11, 20);
        for _ in 0..5 {
            pool.get_id();
        }
        pool.return_id(14);
        pool.return_id(12);

        assert_eq!(pool.get_id(), Some(12));
        assert_eq!(pool.get_id(), Some(14));
        assert_eq!(pool.get_id(), Some(16));
    }

    #[test]
    fn test_foreign_and_duplicate_returns_ignored() {
        let mut pool = IdPool::new(1, 10);
        pool.get_id();
        pool.get_id();

        pool.return_id(50);
        pool.return_id(7);
        pool.return_id(2);
        pool.return_id(2);

        assert_eq!(pool.available(), 9);
        assert_eq!(pool.get_id(), Some(2));
        assert_eq!(pool.get_id(), Some(3));
    }
}
