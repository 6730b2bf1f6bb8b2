//! Square grid addressing shared by the analyzer, the generator and adapters.

use serde::{Deserialize, Serialize};

use crate::{Direction, RoomFlags};

/// Row-major addressing for a `width × width` grid of rooms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridGeometry {
    width: usize,
}

impl GridGeometry {
    /// Creates the addressing scheme for a square grid of the given width.
    #[must_use]
    pub const fn new(width: usize) -> Self {
        Self { width }
    }

    /// Number of rooms along each axis.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Total number of rooms, saturating on overflow.
    #[must_use]
    pub const fn room_count(&self) -> usize {
        self.width.saturating_mul(self.width)
    }

    /// Column and row of the room stored at `index`.
    #[must_use]
    pub fn coords(&self, index: usize) -> Option<(usize, usize)> {
        if self.width == 0 || index >= self.room_count() {
            return None;
        }
        Some((index % self.width, index / self.width))
    }

    /// Linear index of the room at column `x`, row `y`, or `None` outside the grid.
    #[must_use]
    pub fn index(&self, x: i64, y: i64) -> Option<usize> {
        let column = usize::try_from(x).ok()?;
        let row = usize::try_from(y).ok()?;
        if column >= self.width || row >= self.width {
            return None;
        }
        row.checked_mul(self.width)?.checked_add(column)
    }

    /// Neighbouring room in `direction`, ignoring whether any door is open.
    #[must_use]
    pub fn neighbor_index(&self, index: usize, direction: Direction) -> Option<usize> {
        let (column, row) = self.coords(index)?;
        let (dx, dy) = direction.offset();
        let column = i64::try_from(column).ok()?;
        let row = i64::try_from(row).ok()?;
        self.index(column + dx, row + dy)
    }

    /// In-bounds neighbours of `index` paired with the direction leading to them.
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = (Direction, usize)> + '_ {
        Direction::ALL.into_iter().filter_map(move |direction| {
            self.neighbor_index(index, direction)
                .map(|neighbor| (direction, neighbor))
        })
    }
}

/// Creates `width * width` fully open rooms without items.
#[must_use]
pub fn create_identity_grid(width: usize) -> Vec<RoomFlags> {
    vec![RoomFlags::IDENTITY; GridGeometry::new(width).room_count()]
}

/// Linear index of the neighbour of `index` in `direction`, or `None` outside the grid.
#[must_use]
pub fn neighbor_index(index: usize, direction: Direction, width: usize) -> Option<usize> {
    GridGeometry::new(width).neighbor_index(index, direction)
}
