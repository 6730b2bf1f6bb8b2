#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session bootstrap that enforces a single field producer.
//!
//! Exactly one participant, the session owner, runs the generator. Everyone
//! else waits for the owner's field to arrive through replication and treats
//! it as read-only.

use fantomo_core::{FieldConfig, GenerationError};
use fantomo_system_generator::{FieldGenerator, SeededFieldGenerator};
use fantomo_world::Field;
use thiserror::Error;
use tracing::{debug, info};

/// Part a participant plays in the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Holds authority over the session and generates the field.
    Owner,
    /// Receives the owner's field and never generates.
    Participant,
}

/// Reasons a participant could not obtain a field.
#[derive(Debug, Error, PartialEq)]
pub enum BootstrapError {
    /// Generation failed on the owner.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// A participant has not received the owner's field yet.
    #[error("waiting for the session owner to replicate the field")]
    AwaitingReplication,
}

/// Decides where the session's field comes from.
#[derive(Clone, Copy, Debug)]
pub struct Bootstrap {
    role: Role,
}

impl Bootstrap {
    /// Creates a bootstrap for the provided role.
    #[must_use]
    pub const fn new(role: Role) -> Self {
        Self { role }
    }

    /// Reports whether the local participant is responsible for generation.
    #[must_use]
    pub const fn should_generate(&self) -> bool {
        matches!(self.role, Role::Owner)
    }

    /// Creates the generator the owner drives, or `None` for participants.
    pub fn generator(
        &self,
        config: FieldConfig,
        seed: u64,
    ) -> Result<Option<SeededFieldGenerator>, BootstrapError> {
        if !self.should_generate() {
            return Ok(None);
        }
        Ok(Some(FieldGenerator::seeded(config, seed)?))
    }

    /// Obtains the session field.
    ///
    /// The owner generates synchronously and ignores anything replicated to
    /// it. A participant returns the replicated field untouched.
    pub fn acquire(
        &self,
        config: FieldConfig,
        seed: u64,
        replicated: Option<Field>,
    ) -> Result<Field, BootstrapError> {
        match self.role {
            Role::Owner => {
                if replicated.is_some() {
                    debug!("owner discarded a replicated field");
                }
                let mut generator = FieldGenerator::seeded(config, seed)?;
                generator.finish()?;
                let field = generator.into_field()?;
                info!(seed, rooms = field.to_bytes().len(), "owner generated field");
                Ok(field)
            }
            Role::Participant => {
                let field = replicated.ok_or(BootstrapError::AwaitingReplication)?;
                info!("participant accepted replicated field");
                Ok(field)
            }
        }
    }
}
