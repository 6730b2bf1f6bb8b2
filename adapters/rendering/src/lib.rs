#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Fantomo adapters.
//!
//! Engines never read room bytes directly. They receive one
//! [`RoomPlacement`] per room describing where the room sits in world space,
//! which of its four sides shows a door and which item prefab it spawns.

use std::io::Write;

use anyhow::{bail, Result as AnyResult};
use fantomo_core::{Direction, Item, DIRECTION_COUNT};
use fantomo_world::{query, Field};
use glam::Vec3;

/// Visual shown on one side of a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// A traversable doorway into the neighbouring room.
    Door,
    /// A solid wall, either on the outer boundary or where a door was removed.
    Wall,
}

/// Item prefab instantiated at a room's position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Prefab {
    /// Collectible key.
    Key,
    /// Mine hazard.
    Mine,
    /// Player spawn marker.
    SpawnMarker,
}

impl From<Item> for Prefab {
    fn from(item: Item) -> Self {
        match item {
            Item::Key => Self::Key,
            Item::Mine => Self::Mine,
            Item::Spawn => Self::SpawnMarker,
        }
    }
}

/// Everything an engine needs to instantiate one room.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoomPlacement {
    /// Room index in the field.
    pub index: usize,
    /// World-space origin of the room on the ground plane.
    pub position: Vec3,
    /// Side visuals indexed by [`Direction::index`].
    pub sides: [Side; DIRECTION_COUNT],
    /// Item prefab to spawn, if any.
    pub prefab: Option<Prefab>,
}

impl RoomPlacement {
    /// Visual shown towards `direction`.
    #[must_use]
    pub const fn side(&self, direction: Direction) -> Side {
        self.sides[direction.index()]
    }
}

/// Builds the placement for every room of a field in index order.
///
/// Room `(x, y)` sits at `(x * room_size, 0, y * room_size)`. A side shows a
/// door only when the passage can actually be crossed, so the outer boundary
/// is always walled.
#[must_use]
pub fn scene(field: &Field, room_size: f32) -> Vec<RoomPlacement> {
    let geometry = query::geometry(field);

    query::rooms(field)
        .iter()
        .enumerate()
        .map(|(index, room)| {
            let (x, y) = geometry.coords(index).unwrap_or_default();
            let mut sides = [Side::Wall; DIRECTION_COUNT];
            for direction in Direction::ALL {
                if query::is_passage_open(field, index, direction) {
                    sides[direction.index()] = Side::Door;
                }
            }

            RoomPlacement {
                index,
                position: Vec3::new(x as f32 * room_size, 0.0, y as f32 * room_size),
                sides,
                prefab: room.item().map(Prefab::from),
            }
        })
        .collect()
}

/// Backend capable of presenting a generated field.
pub trait FieldPresenter {
    /// Presents the placements of a `width` x `width` field.
    fn present(&mut self, placements: &[RoomPlacement], width: usize) -> AnyResult<()>;
}

/// Presenter that writes a plain ASCII map.
///
/// Each room is drawn as a three character cell framed by `+`, `-` and `|`.
/// Gaps in the frame are doors; the cell shows `K`, `M`, `S` or `.`.
#[derive(Debug)]
pub struct TextPresenter<W> {
    out: W,
}

impl<W: Write> TextPresenter<W> {
    /// Creates a presenter writing to `out`.
    #[must_use]
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FieldPresenter for TextPresenter<W> {
    fn present(&mut self, placements: &[RoomPlacement], width: usize) -> AnyResult<()> {
        if width == 0 || placements.len() != width * width {
            bail!(
                "cannot present {} rooms as a {width}x{width} field",
                placements.len()
            );
        }

        for row in placements.chunks(width) {
            writeln!(self.out, "{}", horizontal_edge(row, Direction::North))?;
            let mut line = String::with_capacity(width * 4 + 1);
            for placement in row {
                line.push(vertical_edge(placement.side(Direction::West)));
                line.push(' ');
                line.push(glyph(placement.prefab));
                line.push(' ');
            }
            if let Some(last) = row.last() {
                line.push(vertical_edge(last.side(Direction::East)));
            }
            writeln!(self.out, "{line}")?;
        }

        if let Some(bottom) = placements.chunks(width).last() {
            writeln!(self.out, "{}", horizontal_edge(bottom, Direction::South))?;
        }
        self.out.flush()?;
        Ok(())
    }
}

fn horizontal_edge(row: &[RoomPlacement], direction: Direction) -> String {
    let mut line = String::with_capacity(row.len() * 4 + 1);
    for placement in row {
        line.push('+');
        line.push_str(match placement.side(direction) {
            Side::Door => "   ",
            Side::Wall => "---",
        });
    }
    line.push('+');
    line
}

fn vertical_edge(side: Side) -> char {
    match side {
        Side::Door => ' ',
        Side::Wall => '|',
    }
}

fn glyph(prefab: Option<Prefab>) -> char {
    match prefab {
        Some(Prefab::Key) => 'K',
        Some(Prefab::Mine) => 'M',
        Some(Prefab::SpawnMarker) => 'S',
        None => '.',
    }
}
