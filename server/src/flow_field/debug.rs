//! Text dump of a grid for debug logging.

use super::grid::{CellKind, Grid};
use super::{Coordinate, Direction};
use std::f32::consts::FRAC_PI_4;
use std::fmt;

const ARROWS: [char; 8] = ['→', '↗', '↑', '↖', '←', '↙', '↓', '↘'];

/// Arrow for a direction in grid space, where `+y` points down the screen.
pub fn arrow(direction: Direction) -> Option<char> {
    if direction.is_zero() {
        return None;
    }
    let octant = ((-direction.y).atan2(direction.x) / FRAC_PI_4).round() as i32;
    Some(ARROWS[octant.rem_euclid(8) as usize])
}

/// One row per grid row with column labels on top. Obstacles print as `C`,
/// enemies as `●`, everything else as its direction arrow or blank.
pub fn render_field(grid: &Grid, enemies: &[Coordinate]) -> String {
    FieldDump { grid, enemies }.to_string()
}

struct FieldDump<'a> {
    grid: &'a Grid,
    enemies: &'a [Coordinate],
}

impl fmt::Display for FieldDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("    |")?;
        for x in 0..self.grid.width() {
            write!(f, "{:^3}|", x % 1000)?;
        }
        writeln!(f)?;

        for y in 0..self.grid.height() as i32 {
            write!(f, "{:>4}|", y)?;
            for x in 0..self.grid.width() as i32 {
                write!(f, " {} |", self.symbol(Coordinate::new(x, y)))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl FieldDump<'_> {
    fn symbol(&self, at: Coordinate) -> char {
        if self.grid.kind(at) == Some(CellKind::Obstacle) {
            'C'
        } else if self.enemies.contains(&at) {
            '●'
        } else {
            self.grid.direction(at).and_then(arrow).unwrap_or(' ')
        }
    }
}
