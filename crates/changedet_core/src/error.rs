//! Error types for changedet core.

use crate::token::{EntityToken, SessionId};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in change detection.
///
/// The detector has no failure modes of its own; these are raised by the
/// codec or by the host session and passed through unchanged.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Field type conversion failed.
    #[error("codec error: {0}")]
    Codec(#[from] changedet_codec::CodecError),

    /// The host has no metadata for this entity type.
    #[error("unknown entity type: {name}")]
    UnknownEntityType {
        /// Type name that was looked up.
        name: String,
    },

    /// The entity type has no field with this name.
    #[error("unknown field {field} on entity type {entity_type}")]
    UnknownField {
        /// Entity type searched.
        entity_type: String,
        /// Field name that was not found.
        field: String,
    },

    /// The token does not refer to an entity managed by the session.
    #[error("entity {token} is not managed by this session")]
    EntityNotManaged {
        /// Token that was looked up.
        token: EntityToken,
    },

    /// A detector bound to one session was called with another.
    #[error("detector is bound to session {bound}, called from session {actual}")]
    SessionMismatch {
        /// Session the detector is bound to.
        bound: SessionId,
        /// Session that made the call.
        actual: SessionId,
    },
}

impl CoreError {
    /// Creates an unknown entity type error.
    pub fn unknown_entity_type(name: impl Into<String>) -> Self {
        Self::UnknownEntityType { name: name.into() }
    }

    /// Creates an unknown field error.
    pub fn unknown_field(entity_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            entity_type: entity_type.into(),
            field: field.into(),
        }
    }

    /// Creates an entity not managed error.
    pub fn entity_not_managed(token: EntityToken) -> Self {
        Self::EntityNotManaged { token }
    }
}
