#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frozen field state and reachability analysis for Fantomo.
//!
//! A [`Field`] is the only artifact the generator publishes. It can be built
//! from a finished working array or from replicated bytes, and in both cases
//! every structural invariant is checked before a value exists. Once built it
//! is read-only; adapters inspect it through the [`query`] module.

pub mod reachability;

use fantomo_core::{FieldConfig, FieldError, GridGeometry, Item, RoomFlags};

use crate::reachability::{first_walkable, one_sided_door, surrounded_mine, Reachability};

/// Immutable room array produced by a completed generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    geometry: GridGeometry,
    rooms: Vec<RoomFlags>,
}

impl Field {
    /// Seals a room array after checking every structural invariant.
    pub fn from_rooms(width: usize, rooms: Vec<RoomFlags>) -> Result<Self, FieldError> {
        verify(&rooms, width)?;
        Ok(Self {
            geometry: GridGeometry::new(width),
            rooms,
        })
    }

    /// Seals raw replicated bytes, rejecting bits outside the room layout.
    pub fn from_bytes(width: usize, bytes: &[u8]) -> Result<Self, FieldError> {
        let rooms = bytes
            .iter()
            .enumerate()
            .map(|(index, &bits)| {
                RoomFlags::from_bits(bits).ok_or(FieldError::UnknownBits { index, bits })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_rooms(width, rooms)
    }

    /// Raw room bytes in index order.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.rooms.iter().map(|room| room.to_byte()).collect()
    }

    /// Checks that the item counts match what the configuration asked for.
    pub fn verify_counts(&self, config: &FieldConfig) -> Result<(), FieldError> {
        for item in Item::ALL {
            let expected = usize::try_from(config.item_target(item)).unwrap_or(usize::MAX);
            let found = query::item_rooms(self, item).len();
            if found != expected {
                return Err(FieldError::ItemCount {
                    item,
                    expected,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// Checks the structural invariants of a room array.
///
/// Items are not stacked, doors agree on both sides, every walkable room is
/// connected to every other and no mine is surrounded by mines.
pub fn verify(rooms: &[RoomFlags], width: usize) -> Result<(), FieldError> {
    if width == 0 {
        return Err(FieldError::ZeroWidth);
    }

    let expected = GridGeometry::new(width).room_count();
    if rooms.len() != expected {
        return Err(FieldError::LengthMismatch {
            width,
            expected,
            found: rooms.len(),
        });
    }

    if let Some(index) = rooms.iter().position(|room| room.item_count() > 1) {
        return Err(FieldError::StackedItems { index });
    }

    if let Some((index, direction)) = one_sided_door(rooms, width) {
        return Err(FieldError::AsymmetricDoor { index, direction });
    }

    let walkable = rooms.iter().filter(|room| !room.has_mine()).count();
    if let Some(start) = first_walkable(rooms) {
        let reachable = Reachability::new().count(rooms, width, start);
        if reachable != walkable {
            return Err(FieldError::Disconnected {
                reachable,
                walkable,
            });
        }
    }

    if let Some(index) = surrounded_mine(rooms, width) {
        return Err(FieldError::SurroundedMine { index });
    }

    Ok(())
}

/// Read-only accessors over a sealed [`Field`].
pub mod query {
    use fantomo_core::{Direction, GridGeometry, Item, RoomFlags};

    use super::Field;
    use crate::reachability::{self, first_walkable};

    /// Addressing scheme of the field.
    #[must_use]
    pub fn geometry(field: &Field) -> GridGeometry {
        field.geometry
    }

    /// Every room in index order.
    #[must_use]
    pub fn rooms(field: &Field) -> &[RoomFlags] {
        &field.rooms
    }

    /// Indices of the rooms holding `item`, ascending.
    #[must_use]
    pub fn item_rooms(field: &Field, item: Item) -> Vec<usize> {
        field
            .rooms
            .iter()
            .enumerate()
            .filter(|(_, room)| room.contains(item.flag()))
            .map(|(index, _)| index)
            .collect()
    }

    /// Indices of the rooms holding a key.
    #[must_use]
    pub fn key_rooms(field: &Field) -> Vec<usize> {
        item_rooms(field, Item::Key)
    }

    /// Indices of the rooms holding a mine.
    #[must_use]
    pub fn mine_rooms(field: &Field) -> Vec<usize> {
        item_rooms(field, Item::Mine)
    }

    /// Indices of the rooms marked as spawn points.
    #[must_use]
    pub fn spawn_rooms(field: &Field) -> Vec<usize> {
        item_rooms(field, Item::Spawn)
    }

    /// Reports whether the door from `index` towards `direction` can be crossed.
    #[must_use]
    pub fn is_passage_open(field: &Field, index: usize, direction: Direction) -> bool {
        reachability::is_passage_open(&field.rooms, field.geometry.width(), index, direction)
    }

    /// Number of walkable rooms connected to the first walkable room.
    #[must_use]
    pub fn reachable_rooms(field: &Field) -> usize {
        first_walkable(&field.rooms).map_or(0, |start| {
            reachability::reachable_count(&field.rooms, field.geometry.width(), start)
        })
    }
}
