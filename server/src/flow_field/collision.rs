use super::Coordinate;
use std::collections::BTreeSet;

/// Inflates every obstacle to the `(2 * padding + 1)²` square around it.
///
/// Wall tiles are thin compared to an enemy, so without the margin paths
/// hug corners closely enough for enemies to clip into them. The result is
/// sorted and free of duplicates; coordinates may fall outside the grid.
pub fn expand(obstacles: &[Coordinate], padding: i32) -> Vec<Coordinate> {
    let padding = padding.max(0);
    let mut expanded = BTreeSet::new();

    for obstacle in obstacles {
        for dy in -padding..=padding {
            for dx in -padding..=padding {
                expanded.insert(obstacle.offset(dx, dy));
            }
        }
    }

    expanded.into_iter().collect()
}
