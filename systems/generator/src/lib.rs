#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Procedural field generation for Fantomo.
//!
//! The generator starts from a fully open grid and runs four phases in order:
//! door pruning, mine placement, key placement and spawn placement. Each
//! phase is a reject-and-retry loop. A uniformly random candidate mutation is
//! applied, validated against the reachability analyzer and reverted when it
//! breaks an invariant. A single [`FieldGenerator::step`] call performs one
//! such iteration so hosts can spread generation across frames.

use fantomo_core::{
    Direction, Event, FieldConfig, GenerationError, GridGeometry, Item, Phase, Progress,
    RoomFlags, DIRECTION_COUNT,
};
use fantomo_world::{
    reachability::{first_walkable, has_surrounded_mine, Reachability},
    Field,
};
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

pub use rand_chacha::ChaCha8Rng;

/// Generator driven by the crate's seeded ChaCha8 stream.
pub type SeededFieldGenerator = FieldGenerator<ChaCha8Rng>;

/// Validates `config`, runs every phase to completion and publishes the field.
///
/// Nothing is returned unless all four phases finished and the result passed
/// its final invariant check.
pub fn generate_field<R: Rng>(
    config: FieldConfig,
    rng: &mut R,
) -> Result<Field, GenerationError> {
    let mut generator = FieldGenerator::new(config, rng)?;
    generator.finish()?;
    generator.into_field()
}

/// Resumable state machine that owns the working room array.
#[derive(Debug)]
pub struct FieldGenerator<R> {
    config: FieldConfig,
    geometry: GridGeometry,
    rng: R,
    rooms: Vec<RoomFlags>,
    reachability: Reachability,
    phase: Phase,
    phase_started: bool,
    target: u32,
    completed: u32,
    attempts: u64,
    rejections: u64,
}

impl FieldGenerator<ChaCha8Rng> {
    /// Creates a generator driven by a ChaCha8 stream seeded from `seed`.
    pub fn seeded(config: FieldConfig, seed: u64) -> Result<Self, GenerationError> {
        Self::new(config, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> FieldGenerator<R> {
    /// Creates a generator after validating the configuration.
    pub fn new(config: FieldConfig, rng: R) -> Result<Self, GenerationError> {
        config.validate()?;

        let geometry = config.geometry();
        let mut generator = Self {
            config,
            geometry,
            rng,
            rooms: fantomo_core::create_identity_grid(geometry.width()),
            reachability: Reachability::new(),
            phase: Phase::DoorPruning,
            phase_started: false,
            target: 0,
            completed: 0,
            attempts: 0,
            rejections: 0,
        };
        generator.target = generator.phase_target(Phase::DoorPruning);
        Ok(generator)
    }

    /// Phase the next [`FieldGenerator::step`] works on.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Reports whether every phase completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Cumulative progress across all phases.
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress::from_phase(self.phase, self.completed, self.target)
    }

    /// Working room array, mutable only by the generator itself.
    #[must_use]
    pub fn rooms(&self) -> &[RoomFlags] {
        &self.rooms
    }

    /// Performs a single retry iteration of the active phase.
    ///
    /// Emits [`Event::ProgressAdvanced`] every call, followed by
    /// [`Event::FieldCompleted`] on the call that finishes the last phase.
    /// Once the generator is finished further calls do nothing.
    pub fn step(&mut self, out_events: &mut Vec<Event>) -> Result<(), GenerationError> {
        if self.phase == Phase::Finished {
            return Ok(());
        }

        if !self.phase_started {
            self.phase_started = true;
            out_events.push(Event::PhaseStarted {
                phase: self.phase,
                target: self.target,
            });
        }

        if self.completed < self.target {
            self.attempt(out_events)?;
        }

        if self.completed >= self.target {
            self.finish_phase(out_events);
        }

        out_events.push(Event::ProgressAdvanced {
            progress: self.progress(),
        });

        if self.phase == Phase::Finished {
            info!(rooms = self.rooms.len(), "field completed");
            out_events.push(Event::FieldCompleted);
        }
        Ok(())
    }

    /// Steps until the active phase completes and returns the phase that follows.
    pub fn complete_phase(&mut self, out_events: &mut Vec<Event>) -> Result<Phase, GenerationError> {
        let phase = self.phase;
        while self.phase == phase && phase != Phase::Finished {
            self.step(out_events)?;
        }
        Ok(self.phase)
    }

    /// Steps until every phase completes.
    pub fn run(&mut self, out_events: &mut Vec<Event>) -> Result<(), GenerationError> {
        while !self.is_finished() {
            self.step(out_events)?;
        }
        Ok(())
    }

    /// Steps until every phase completes, discarding events as they arrive.
    pub fn finish(&mut self) -> Result<(), GenerationError> {
        let mut events = Vec::new();
        while !self.is_finished() {
            events.clear();
            self.step(&mut events)?;
        }
        Ok(())
    }

    /// Publishes the finished field.
    ///
    /// Fails with [`GenerationError::Incomplete`] while any phase is pending.
    pub fn into_field(self) -> Result<Field, GenerationError> {
        if self.phase != Phase::Finished {
            return Err(GenerationError::Incomplete { phase: self.phase });
        }

        let field = Field::from_rooms(self.geometry.width(), self.rooms)?;
        field.verify_counts(&self.config)?;
        Ok(field)
    }

    fn attempt(&mut self, out_events: &mut Vec<Event>) -> Result<(), GenerationError> {
        self.attempts += 1;

        let accepted = match self.phase {
            Phase::DoorPruning => self.try_remove_door(),
            Phase::MinePlacement => self.try_place_mine(),
            Phase::KeyPlacement => self.try_place_item(Item::Key),
            Phase::SpawnPlacement => self.try_place_item(Item::Spawn),
            Phase::Finished => None,
        };

        match accepted {
            Some(room) => {
                self.completed += 1;
                self.rejections = 0;
                debug!(phase = %self.phase, room, completed = self.completed, "candidate accepted");
                out_events.push(Event::CandidateAccepted {
                    phase: self.phase,
                    room,
                });
            }
            None => {
                self.rejections += 1;
                if self.rejections > self.rejection_budget() {
                    warn!(
                        phase = %self.phase,
                        rejections = self.rejections,
                        completed = self.completed,
                        target = self.target,
                        "phase did not converge"
                    );
                    return Err(GenerationError::Infeasible {
                        phase: self.phase,
                        attempts: self.rejections,
                    });
                }
            }
        }

        Ok(())
    }

    fn finish_phase(&mut self, out_events: &mut Vec<Event>) {
        info!(phase = %self.phase, attempts = self.attempts, placed = self.completed, "phase completed");
        out_events.push(Event::PhaseCompleted {
            phase: self.phase,
            attempts: self.attempts,
        });

        self.phase = self.phase.next();
        self.phase_started = false;
        self.target = self.phase_target(self.phase);
        self.completed = 0;
        self.attempts = 0;
        self.rejections = 0;
    }

    /// Closes a random door, keeping it only if every room stays reachable
    /// from room 0.
    ///
    /// Interior doors are closed on both sides. A boundary door has no
    /// counterpart, so only its own bit is cleared.
    fn try_remove_door(&mut self) -> Option<usize> {
        let index = self.rng.gen_range(0..self.rooms.len());
        let direction = Direction::ALL[self.rng.gen_range(0..DIRECTION_COUNT)];

        if !self.rooms[index].is_open(direction) {
            return None;
        }

        let neighbor = self.geometry.neighbor_index(index, direction);
        self.rooms[index].remove(direction.bit());
        if let Some(neighbor) = neighbor {
            self.rooms[neighbor].remove(direction.inverse().bit());
        }

        let reachable = self
            .reachability
            .count(&self.rooms, self.geometry.width(), 0);
        if reachable == self.rooms.len() {
            return Some(index);
        }

        self.rooms[index].insert(direction.bit());
        if let Some(neighbor) = neighbor {
            self.rooms[neighbor].insert(direction.inverse().bit());
        }
        None
    }

    /// Mines a random room, keeping it only if no mine ends up surrounded and
    /// every other walkable room stays connected.
    fn try_place_mine(&mut self) -> Option<usize> {
        let index = self.rng.gen_range(0..self.rooms.len());
        if self.rooms[index].has_mine() {
            return None;
        }

        self.rooms[index].insert(RoomFlags::HAS_MINE);

        let placed = usize::try_from(self.completed).unwrap_or(usize::MAX) + 1;
        let walkable = self.rooms.len().saturating_sub(placed);
        let reachable = first_walkable(&self.rooms).map_or(0, |start| {
            self.reachability
                .count(&self.rooms, self.geometry.width(), start)
        });

        if reachable == walkable && !has_surrounded_mine(&self.rooms, self.geometry.width()) {
            return Some(index);
        }

        self.rooms[index].remove(RoomFlags::HAS_MINE);
        None
    }

    /// Drops `item` into a random room that holds nothing yet.
    fn try_place_item(&mut self, item: Item) -> Option<usize> {
        let index = self.rng.gen_range(0..self.rooms.len());
        if self.rooms[index].has_any_item() {
            return None;
        }

        self.rooms[index].insert(item.flag());
        Some(index)
    }

    fn phase_target(&self, phase: Phase) -> u32 {
        match phase {
            Phase::DoorPruning => {
                u32::try_from(self.config.door_removal_target()).unwrap_or(u32::MAX)
            }
            Phase::MinePlacement => self.config.item_target(Item::Mine),
            Phase::KeyPlacement => self.config.item_target(Item::Key),
            Phase::SpawnPlacement => self.config.item_target(Item::Spawn),
            Phase::Finished => 0,
        }
    }

    /// Consecutive rejections tolerated before the phase is declared infeasible:
    /// `attempt_factor × remaining × candidate space`.
    fn rejection_budget(&self) -> u64 {
        let remaining = u64::from(self.target.saturating_sub(self.completed)).max(1);
        let rooms = u64::try_from(self.rooms.len()).unwrap_or(u64::MAX);
        let candidates = match self.phase {
            Phase::DoorPruning => rooms.saturating_mul(DIRECTION_COUNT as u64),
            _ => rooms,
        };
        u64::from(self.config.attempt_factor)
            .saturating_mul(remaining)
            .saturating_mul(candidates)
    }
}
