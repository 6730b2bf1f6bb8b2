#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Replication contract for finished fields.
//!
//! The session owner captures its [`Field`] into a [`FieldSnapshot`] and
//! broadcasts the single-line encoding. Participants decode it and call
//! [`FieldSnapshot::into_field`], which re-checks every invariant, so a
//! corrupted or tampered payload never becomes a usable field.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use fantomo_core::{FieldError, Item};
use fantomo_world::{query, Field};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SNAPSHOT_DOMAIN: &str = "field";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub const SNAPSHOT_HEADER: &str = "field:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Wire form of a finished field.
///
/// The item index lists duplicate what the room bytes already encode; they
/// let consumers place item visuals without scanning every room and are
/// cross-checked on decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSnapshot {
    /// Rooms along each axis.
    pub width: u32,
    /// Room bytes in index order.
    pub rooms: Vec<u8>,
    /// Rooms holding a key, ascending.
    pub keys: Vec<u32>,
    /// Rooms holding a mine, ascending.
    pub mines: Vec<u32>,
    /// Rooms marked as spawn points, ascending.
    pub spawns: Vec<u32>,
}

impl FieldSnapshot {
    /// Captures a sealed field for broadcast.
    #[must_use]
    pub fn capture(field: &Field) -> Self {
        let width = u32::try_from(query::geometry(field).width()).unwrap_or(u32::MAX);
        Self {
            width,
            rooms: field.to_bytes(),
            keys: indices(field, Item::Key),
            mines: indices(field, Item::Mine),
            spawns: indices(field, Item::Spawn),
        }
    }

    /// Encodes the snapshot into a single line of the form `field:v1:<w>x<w>:<payload>`.
    pub fn encode(&self) -> Result<String, TransferError> {
        let payload = SerializablePayload {
            rooms: self.rooms.clone(),
            keys: self.keys.clone(),
            mines: self.mines.clone(),
            spawns: self.spawns.clone(),
        };
        let json = serde_json::to_vec(&payload).map_err(TransferError::Serialize)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{SNAPSHOT_HEADER}{FIELD_DELIMITER}{0}x{0}{FIELD_DELIMITER}{encoded}",
            self.width
        ))
    }

    /// Decodes a snapshot from its single-line representation.
    ///
    /// Only the framing is checked here; call [`FieldSnapshot::into_field`]
    /// to validate the field itself.
    pub fn decode(value: &str) -> Result<Self, TransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(TransferError::MissingPrefix)?;
        let version = parts.next().ok_or(TransferError::MissingVersion)?;
        let dimensions = parts.next().ok_or(TransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(TransferError::MissingPayload)?;
        if parts.next().is_some() {
            return Err(TransferError::TrailingSegments);
        }

        if domain != SNAPSHOT_DOMAIN {
            return Err(TransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(TransferError::UnsupportedVersion(version.to_owned()));
        }

        let width = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(TransferError::InvalidEncoding)?;
        let decoded: SerializablePayload =
            serde_json::from_slice(&bytes).map_err(TransferError::InvalidPayload)?;

        Ok(Self {
            width,
            rooms: decoded.rooms,
            keys: decoded.keys,
            mines: decoded.mines,
            spawns: decoded.spawns,
        })
    }

    /// Seals the snapshot into a read-only field after re-checking it.
    pub fn into_field(self) -> Result<Field, TransferError> {
        let width = usize::try_from(self.width).map_err(|_| {
            TransferError::InvalidDimensions(format!("{0}x{0}", self.width))
        })?;
        let field = Field::from_bytes(width, &self.rooms)?;

        for (item, listed) in [
            (Item::Key, &self.keys),
            (Item::Mine, &self.mines),
            (Item::Spawn, &self.spawns),
        ] {
            if indices(&field, item) != *listed {
                return Err(TransferError::IndexMismatch { item });
            }
        }

        Ok(field)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializablePayload {
    rooms: Vec<u8>,
    keys: Vec<u32>,
    mines: Vec<u32>,
    spawns: Vec<u32>,
}

/// Errors raised while encoding, decoding or sealing a snapshot.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("replication payload was empty")]
    EmptyPayload,
    /// The prefix segment was missing.
    #[error("field string is missing the prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("field string is missing the version")]
    MissingVersion,
    /// The grid dimensions segment was missing.
    #[error("field string is missing the grid dimensions")]
    MissingDimensions,
    /// The payload segment was missing.
    #[error("field string is missing the payload")]
    MissingPayload,
    /// Segments followed the payload.
    #[error("field string has segments after the payload")]
    TrailingSegments,
    /// The prefix segment named another domain.
    #[error("field prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The version segment named an unknown format revision.
    #[error("field version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The dimensions could not be parsed or do not describe a square grid.
    #[error("could not parse square grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode field payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The decoded payload could not be deserialised.
    #[error("could not parse field payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
    /// The snapshot could not be serialised.
    #[error("could not serialise field payload: {0}")]
    Serialize(#[source] serde_json::Error),
    /// The rooms violate a field invariant.
    #[error("replicated field is invalid: {0}")]
    InvalidField(#[from] FieldError),
    /// An item index list disagrees with the room bytes.
    #[error("{item} index list disagrees with the room bytes")]
    IndexMismatch {
        /// Item whose list diverged.
        item: Item,
    },
}

fn indices(field: &Field, item: Item) -> Vec<u32> {
    query::item_rooms(field, item)
        .into_iter()
        .map(|index| u32::try_from(index).unwrap_or(u32::MAX))
        .collect()
}

fn parse_dimensions(dimensions: &str) -> Result<u32, TransferError> {
    let invalid = || TransferError::InvalidDimensions(dimensions.to_owned());

    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;
    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;

    if columns == 0 || columns != rows {
        return Err(invalid());
    }

    Ok(columns)
}
