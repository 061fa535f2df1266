use super::Coordinate;

/// Inclusive window of rows and columns that currently hold an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionBounds {
    pub min_row: i32,
    pub min_col: i32,
    pub max_row: i32,
    pub max_col: i32,
}

impl RegionBounds {
    /// The whole grid, or `None` for an empty one.
    pub fn full(width: usize, height: usize) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            min_row: 0,
            min_col: 0,
            max_row: height as i32 - 1,
            max_col: width as i32 - 1,
        })
    }

    /// Enclosing box of `points` clamped to a `width × height` grid. `None`
    /// when there are no points or the grid is empty.
    pub fn enclosing<I>(points: I, width: usize, height: usize) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let grid = Self::full(width, height)?;
        let mut points = points.into_iter();
        let first = points.next()?;

        let mut raw = Self {
            min_row: first.y,
            min_col: first.x,
            max_row: first.y,
            max_col: first.x,
        };
        for at in points {
            raw.min_row = raw.min_row.min(at.y);
            raw.min_col = raw.min_col.min(at.x);
            raw.max_row = raw.max_row.max(at.y);
            raw.max_col = raw.max_col.max(at.x);
        }

        Some(Self {
            min_row: raw.min_row.clamp(0, grid.max_row),
            min_col: raw.min_col.clamp(0, grid.max_col),
            max_row: raw.max_row.clamp(0, grid.max_row),
            max_col: raw.max_col.clamp(0, grid.max_col),
        })
    }

    pub fn contains(&self, at: Coordinate) -> bool {
        self.cols().contains(&at.x) && self.rows().contains(&at.y)
    }

    pub fn rows(&self) -> std::ops::RangeInclusive<i32> {
        self.min_row..=self.max_row
    }

    pub fn cols(&self) -> std::ops::RangeInclusive<i32> {
        self.min_col..=self.max_col
    }

    pub fn area(&self) -> usize {
        self.rows().count() * self.cols().count()
    }

    /// Row-major walk over the window.
    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> {
        let cols = self.cols();
        self.rows()
            .flat_map(move |y| cols.clone().map(move |x| Coordinate::new(x, y)))
    }
}
