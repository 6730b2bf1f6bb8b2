//! Immutable per-session generator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{GridGeometry, Item, DIRECTION_COUNT};

/// Rooms along each axis of the default field.
pub const DEFAULT_WIDTH: u32 = 8;
/// Mines placed into the default field.
pub const DEFAULT_MINES: u32 = 9;
/// Keys placed into the default field.
pub const DEFAULT_KEYS: u32 = 9;
/// Spawn points placed into the default field, one per player.
pub const DEFAULT_SPAWNS: u32 = 3;
/// Fraction of the `rooms × 4` door slots removed while pruning.
pub const DEFAULT_DOOR_REMOVAL_RATE: f32 = 0.01;
/// Edge length of a room in world units.
pub const DEFAULT_ROOM_SIZE: f32 = 10.0;
/// Delay between cooperative generator iterations.
pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_millis(200);
/// Multiplier applied to the non-convergence guard.
pub const DEFAULT_ATTEMPT_FACTOR: u32 = 100;

/// Tuning surface for a single generation session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Rooms along each axis; the field holds `width²` rooms.
    pub width: u32,
    /// Mines to place.
    pub mines: u32,
    /// Keys to place.
    pub keys: u32,
    /// Player spawn points to place.
    pub spawns: u32,
    /// Fraction in `[0, 1)` of the `rooms × 4` door slots to remove.
    pub door_removal_rate: f32,
    /// Edge length of a room in world units, consumed by rendering adapters.
    pub room_size: f32,
    /// Delay a cooperative driver waits between iterations.
    pub step_interval: Duration,
    /// Scales how many consecutive rejections a phase tolerates before giving up.
    pub attempt_factor: u32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            mines: DEFAULT_MINES,
            keys: DEFAULT_KEYS,
            spawns: DEFAULT_SPAWNS,
            door_removal_rate: DEFAULT_DOOR_REMOVAL_RATE,
            room_size: DEFAULT_ROOM_SIZE,
            step_interval: DEFAULT_STEP_INTERVAL,
            attempt_factor: DEFAULT_ATTEMPT_FACTOR,
        }
    }
}

impl FieldConfig {
    /// Addressing scheme for the configured grid.
    #[must_use]
    pub fn geometry(&self) -> GridGeometry {
        GridGeometry::new(usize::try_from(self.width).unwrap_or(usize::MAX))
    }

    /// Total number of rooms in the field.
    #[must_use]
    pub fn room_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.width)
    }

    /// Number of doors the pruning phase removes: `floor(rooms × 4 × rate)`.
    #[must_use]
    pub fn door_removal_target(&self) -> u64 {
        if !self.door_removal_rate.is_finite() || self.door_removal_rate <= 0.0 {
            return 0;
        }
        let slots = self.room_count() as f64 * DIRECTION_COUNT as f64;
        (slots * f64::from(self.door_removal_rate)).floor() as u64
    }

    /// Doors that can be closed without disconnecting the grid.
    ///
    /// That is the `(width - 1)²` interior doors beyond a spanning tree plus
    /// the `4 × width` outer boundary bits.
    #[must_use]
    pub fn removable_doors(&self) -> u64 {
        let inner = u64::from(self.width.saturating_sub(1));
        inner * inner + DIRECTION_COUNT as u64 * u64::from(self.width)
    }

    /// Configured count for the provided item.
    #[must_use]
    pub const fn item_target(&self, item: Item) -> u32 {
        match item {
            Item::Mine => self.mines,
            Item::Key => self.keys,
            Item::Spawn => self.spawns,
        }
    }

    /// Rejects configurations the generator cannot satisfy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::ZeroWidth);
        }

        let rooms = self.room_count();
        if usize::try_from(rooms).is_err() || u32::try_from(rooms).is_err() {
            return Err(ConfigError::GridTooLarge { width: self.width });
        }

        let requested = u64::from(self.mines) + u64::from(self.keys) + u64::from(self.spawns);
        if requested > rooms {
            return Err(ConfigError::CapacityExceeded {
                requested,
                capacity: rooms,
            });
        }

        if !(0.0..1.0).contains(&self.door_removal_rate) {
            return Err(ConfigError::InvalidDoorRemovalRate(self.door_removal_rate));
        }

        let target = self.door_removal_target();
        let removable = self.removable_doors();
        if target > removable {
            return Err(ConfigError::DoorRemovalInfeasible { target, removable });
        }

        if !self.room_size.is_finite() || self.room_size <= 0.0 {
            return Err(ConfigError::InvalidRoomSize(self.room_size));
        }

        if self.attempt_factor == 0 {
            return Err(ConfigError::ZeroAttemptFactor);
        }

        Ok(())
    }
}

/// Reasons a configuration is refused before generation starts.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The grid must contain at least one room.
    #[error("grid width must be positive")]
    ZeroWidth,
    /// The grid is too large to address.
    #[error("grid width {width} produces more rooms than can be addressed")]
    GridTooLarge {
        /// Requested width.
        width: u32,
    },
    /// More items were requested than rooms exist.
    #[error("{requested} items requested but the grid only holds {capacity} rooms")]
    CapacityExceeded {
        /// Sum of mines, keys and spawns.
        requested: u64,
        /// Number of rooms.
        capacity: u64,
    },
    /// The door removal rate lies outside `[0, 1)` or is not a number.
    #[error("door removal rate {0} lies outside [0, 1)")]
    InvalidDoorRemovalRate(f32),
    /// Removing that many doors would necessarily disconnect the grid.
    #[error("cannot remove {target} doors; at most {removable} keep the grid connected")]
    DoorRemovalInfeasible {
        /// Doors the rate asks for.
        target: u64,
        /// Interior doors above a spanning tree plus boundary bits.
        removable: u64,
    },
    /// Rooms need a positive, finite size.
    #[error("room size {0} must be positive and finite")]
    InvalidRoomSize(f32),
    /// The non-convergence guard needs a positive multiplier.
    #[error("attempt factor must be positive")]
    ZeroAttemptFactor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = FieldConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.room_count(), 64);
        assert_eq!(config.door_removal_target(), 2);
    }

    #[test]
    fn zero_width_is_rejected() {
        let config = FieldConfig {
            width: 0,
            ..FieldConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroWidth));
    }

    #[test]
    fn item_overflow_is_rejected() {
        let config = FieldConfig {
            width: 3,
            mines: 10,
            keys: 0,
            spawns: 0,
            ..FieldConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::CapacityExceeded {
                requested: 10,
                capacity: 9,
            })
        );
    }

    #[test]
    fn combined_items_may_fill_the_grid_exactly() {
        let config = FieldConfig {
            width: 3,
            mines: 2,
            keys: 4,
            spawns: 3,
            ..FieldConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn removal_rate_must_stay_below_one() {
        for rate in [1.0, -0.1, f32::NAN] {
            let config = FieldConfig {
                door_removal_rate: rate,
                ..FieldConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidDoorRemovalRate(_))
            ));
        }
    }

    #[test]
    fn removal_beyond_spanning_tree_is_rejected() {
        // 8x8 has 49 interior and 32 boundary removable doors; 0.5 asks for 128.
        let config = FieldConfig {
            door_removal_rate: 0.5,
            ..FieldConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::DoorRemovalInfeasible {
                target: 128,
                removable: 81,
            })
        );
    }

    #[test]
    fn boundary_bits_count_towards_removable_doors() {
        // floor(64 * 4 * 0.2) = 51, above the 49 interior doors alone.
        let config = FieldConfig {
            door_removal_rate: 0.2,
            ..FieldConfig::default()
        };
        assert_eq!(config.door_removal_target(), 51);
        assert_eq!(config.removable_doors(), 81);
        assert_eq!(config.validate(), Ok(()));

        let single = FieldConfig {
            width: 1,
            ..FieldConfig::default()
        };
        assert_eq!(single.removable_doors(), 4);
    }

    #[test]
    fn zero_rate_targets_no_doors() {
        let config = FieldConfig {
            door_removal_rate: 0.0,
            ..FieldConfig::default()
        };
        assert_eq!(config.door_removal_target(), 0);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn config_round_trips_through_bincode() {
        let config = FieldConfig {
            width: 5,
            mines: 3,
            ..FieldConfig::default()
        };
        let bytes = bincode::serialize(&config).expect("serialize");
        let restored: FieldConfig = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, config);
    }
}
