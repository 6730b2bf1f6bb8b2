#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Fantomo field generator.
//!
//! This crate defines the vocabulary every other member speaks. A field is a
//! square grid of rooms, and each room is a single byte: four door bits and
//! three item bits packed into [`RoomFlags`]. The generator system mutates a
//! working array of rooms through four ordered [`Phase`] values, emits
//! [`Event`] values describing its progress, and finally publishes a frozen
//! field that adapters render and replicate but never mutate.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod config;
mod geometry;

pub use config::{
    ConfigError, FieldConfig, DEFAULT_ATTEMPT_FACTOR, DEFAULT_DOOR_REMOVAL_RATE, DEFAULT_KEYS,
    DEFAULT_MINES, DEFAULT_ROOM_SIZE, DEFAULT_SPAWNS, DEFAULT_STEP_INTERVAL, DEFAULT_WIDTH,
};
pub use geometry::{create_identity_grid, neighbor_index, GridGeometry};

/// Number of cardinal directions a room can open towards.
pub const DIRECTION_COUNT: usize = 4;

/// Number of generation phases executed before a field is finished.
pub const PHASE_COUNT: usize = 4;

/// Cardinal directions in canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Towards decreasing row indices (-Y).
    North,
    /// Towards increasing row indices (+Y).
    South,
    /// Towards decreasing column indices (-X).
    West,
    /// Towards increasing column indices (+X).
    East,
}

impl Direction {
    /// Every direction in canonical order.
    pub const ALL: [Direction; DIRECTION_COUNT] = [
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Position of the direction within [`Direction::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::North => 0,
            Self::South => 1,
            Self::West => 2,
            Self::East => 3,
        }
    }

    /// Door bit representing this direction inside a room byte.
    #[must_use]
    pub const fn bit(self) -> RoomFlags {
        DIRECTION_BITS[self.index()]
    }

    /// Direction pointing back towards the origin room.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::South => Self::North,
            Self::West => Self::East,
            Self::East => Self::West,
        }
    }

    /// Unit offset `(dx, dy)` travelled when stepping in this direction.
    #[must_use]
    pub const fn offset(self) -> (i64, i64) {
        match self {
            Self::North => (0, -1),
            Self::South => (0, 1),
            Self::West => (-1, 0),
            Self::East => (1, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::North => "north",
            Self::South => "south",
            Self::West => "west",
            Self::East => "east",
        };
        f.write_str(label)
    }
}

/// Door bits in canonical direction order.
pub const DIRECTION_BITS: [RoomFlags; DIRECTION_COUNT] = [
    RoomFlags::NORTH,
    RoomFlags::SOUTH,
    RoomFlags::WEST,
    RoomFlags::EAST,
];

/// Door bits of the inverse direction, parallel to [`DIRECTION_BITS`].
pub const INVERSE_DIRECTION_BITS: [RoomFlags; DIRECTION_COUNT] = [
    RoomFlags::SOUTH,
    RoomFlags::NORTH,
    RoomFlags::EAST,
    RoomFlags::WEST,
];

bitflags! {
    /// Door and item bits packed into a single room byte.
    ///
    /// A set door bit means the door in that direction is open. The item bits
    /// are disjoint from the door bits; placement policy keeps at most one of
    /// them set per room, but the layout itself does not forbid stacking.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct RoomFlags: u8 {
        /// Door towards -Y is open.
        const NORTH = 1 << 0;
        /// Door towards +Y is open.
        const SOUTH = 1 << 1;
        /// Door towards -X is open.
        const WEST = 1 << 2;
        /// Door towards +X is open.
        const EAST = 1 << 3;
        /// Every door bit.
        const DOORS = Self::NORTH.bits() | Self::SOUTH.bits() | Self::WEST.bits() | Self::EAST.bits();
        /// The room holds a key.
        const HAS_KEY = 1 << 4;
        /// The room holds a mine.
        const HAS_MINE = 1 << 5;
        /// The room is a player spawn point.
        const HAS_SPAWN = 1 << 6;
        /// Every item bit.
        const ITEMS = Self::HAS_KEY.bits() | Self::HAS_MINE.bits() | Self::HAS_SPAWN.bits();
    }
}

impl RoomFlags {
    /// Fully open room without items, the state every room starts in.
    pub const IDENTITY: Self = Self::DOORS;

    /// Wraps a raw room byte, keeping any bits outside the known layout.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self::from_bits_retain(byte)
    }

    /// Raw byte representation used for replication.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self.bits()
    }

    /// Reports whether any of the three item bits is set.
    #[must_use]
    pub const fn has_any_item(self) -> bool {
        self.intersects(Self::ITEMS)
    }

    /// Reports whether the room holds a mine.
    #[must_use]
    pub const fn has_mine(self) -> bool {
        self.contains(Self::HAS_MINE)
    }

    /// Reports whether this room's own door bit for `direction` is set.
    #[must_use]
    pub const fn is_open(self, direction: Direction) -> bool {
        self.contains(direction.bit())
    }

    /// Number of item bits set on the room.
    #[must_use]
    pub const fn item_count(self) -> u32 {
        self.intersection(Self::ITEMS).bits().count_ones()
    }

    /// Item held by the room.
    ///
    /// Mines take precedence over keys and keys over spawns when a hand-built
    /// room stacks several flags.
    #[must_use]
    pub fn item(self) -> Option<Item> {
        Item::ALL.into_iter().find(|item| self.contains(item.flag()))
    }
}

/// Reports whether a raw room byte carries any item bit.
#[must_use]
pub const fn has_any_item(room: u8) -> bool {
    RoomFlags::from_byte(room).has_any_item()
}

/// Item categories the generator places into rooms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Item {
    /// A mine that makes its room impassable for planning purposes.
    Mine,
    /// A key the players collect.
    Key,
    /// A player spawn point.
    Spawn,
}

impl Item {
    /// Every item in precedence order.
    pub const ALL: [Item; 3] = [Item::Mine, Item::Key, Item::Spawn];

    /// Room bit that marks this item.
    #[must_use]
    pub const fn flag(self) -> RoomFlags {
        match self {
            Self::Mine => RoomFlags::HAS_MINE,
            Self::Key => RoomFlags::HAS_KEY,
            Self::Spawn => RoomFlags::HAS_SPAWN,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Mine => "mine",
            Self::Key => "key",
            Self::Spawn => "spawn",
        };
        f.write_str(label)
    }
}

/// Sequential generation stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    /// Removes doors while keeping every room reachable.
    DoorPruning,
    /// Places mines without stranding walkable rooms.
    MinePlacement,
    /// Places keys into empty rooms.
    KeyPlacement,
    /// Places spawn points into empty rooms.
    SpawnPlacement,
    /// Every phase completed; the field may be published.
    Finished,
}

impl Phase {
    /// Zero-based position of the phase; [`Phase::Finished`] maps to [`PHASE_COUNT`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::DoorPruning => 0,
            Self::MinePlacement => 1,
            Self::KeyPlacement => 2,
            Self::SpawnPlacement => 3,
            Self::Finished => PHASE_COUNT,
        }
    }

    /// Phase that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::DoorPruning => Self::MinePlacement,
            Self::MinePlacement => Self::KeyPlacement,
            Self::KeyPlacement => Self::SpawnPlacement,
            Self::SpawnPlacement | Self::Finished => Self::Finished,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::DoorPruning => "door pruning",
            Self::MinePlacement => "mine placement",
            Self::KeyPlacement => "key placement",
            Self::SpawnPlacement => "spawn placement",
            Self::Finished => "finished",
        };
        f.write_str(label)
    }
}

/// Cumulative generation progress in the range `0.0..=1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Progress(f32);

impl Progress {
    /// Progress once every phase finished.
    pub const COMPLETE: Self = Self(1.0);

    /// Computes `phase_index / 4 + local_fraction / 4`.
    ///
    /// A phase whose target is zero counts as locally complete.
    #[must_use]
    pub fn from_phase(phase: Phase, completed: u32, target: u32) -> Self {
        if phase == Phase::Finished {
            return Self::COMPLETE;
        }

        let local = if target == 0 {
            1.0
        } else {
            completed.min(target) as f32 / target as f32
        };
        Self((phase.index() as f32 + local) / PHASE_COUNT as f32)
    }

    /// Raw fractional value.
    #[must_use]
    pub const fn get(self) -> f32 {
        self.0
    }

    /// Reports whether generation reached the end.
    #[must_use]
    pub fn is_complete(self) -> bool {
        self.0 >= 1.0
    }
}

/// Notifications emitted by the generator while it advances.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A phase began with the provided target count.
    PhaseStarted {
        /// Phase that became active.
        phase: Phase,
        /// Number of accepted candidates the phase needs.
        target: u32,
    },
    /// A candidate mutation passed validation and was kept.
    CandidateAccepted {
        /// Phase that accepted the candidate.
        phase: Phase,
        /// Room the mutation touched.
        room: usize,
    },
    /// Cumulative progress after a single iteration.
    ProgressAdvanced {
        /// Progress value suitable for a loading bar.
        progress: Progress,
    },
    /// A phase reached its target.
    PhaseCompleted {
        /// Phase that completed.
        phase: Phase,
        /// Total iterations the phase consumed, accepted or rejected.
        attempts: u64,
    },
    /// All phases finished and the field is ready to publish.
    FieldCompleted,
}

/// Invariant violations detected on a finished or replicated field.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FieldError {
    /// A field must contain at least one room.
    #[error("field width must be positive")]
    ZeroWidth,
    /// The room array does not match the square of the width.
    #[error("expected {expected} rooms for width {width}, found {found}")]
    LengthMismatch {
        /// Declared grid width.
        width: usize,
        /// Number of rooms implied by the width.
        expected: usize,
        /// Number of rooms supplied.
        found: usize,
    },
    /// A room byte sets bits outside the known layout.
    #[error("room {index} carries unknown bits {bits:#04x}")]
    UnknownBits {
        /// Offending room.
        index: usize,
        /// Raw room byte.
        bits: u8,
    },
    /// A room holds more than one item.
    #[error("room {index} holds more than one item")]
    StackedItems {
        /// Offending room.
        index: usize,
    },
    /// A door is open on one side and closed on the other.
    #[error("{direction} door of room {index} disagrees with its neighbour")]
    AsymmetricDoor {
        /// Room whose door is open.
        index: usize,
        /// Direction of the open door.
        direction: Direction,
    },
    /// Some walkable rooms cannot be reached from the others.
    #[error("only {reachable} of {walkable} walkable rooms are connected")]
    Disconnected {
        /// Rooms reached from the first walkable room.
        reachable: usize,
        /// Rooms without a mine.
        walkable: usize,
    },
    /// A mine has mines on all four sides.
    #[error("mine in room {index} is surrounded by mines")]
    SurroundedMine {
        /// Offending mine room.
        index: usize,
    },
    /// The number of rooms holding an item differs from the expectation.
    #[error("expected {expected} {item} rooms, found {found}")]
    ItemCount {
        /// Item that was counted.
        item: Item,
        /// Expected number of rooms.
        expected: usize,
        /// Rooms actually holding the item.
        found: usize,
    },
}

/// Failures that prevent the generator from publishing a field.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GenerationError {
    /// The configuration was rejected before generation started.
    #[error("invalid field configuration: {0}")]
    Config(#[from] ConfigError),
    /// A phase rejected too many consecutive candidates.
    #[error("{phase} did not converge after {attempts} consecutive rejected candidates")]
    Infeasible {
        /// Phase that gave up.
        phase: Phase,
        /// Consecutive rejections observed when the guard tripped.
        attempts: u64,
    },
    /// The field was requested before every phase finished.
    #[error("field generation is incomplete; {phase} is still running")]
    Incomplete {
        /// Phase that was active when the field was requested.
        phase: Phase,
    },
    /// The finished field failed its final invariant check.
    #[error("generated field violates an invariant: {0}")]
    InvalidField(#[from] FieldError),
}
