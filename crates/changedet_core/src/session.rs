//! The host interface the detector works through.

use crate::error::CoreResult;
use crate::metadata::EntityMetadata;
use crate::token::{EntityToken, SessionId};
use changedet_codec::{AppValue, TypeRegistry};
use std::sync::Arc;

/// What the detector needs from the host's unit of work.
///
/// The detector never issues queries and never computes change sets; it
/// only reads metadata and reads or writes field values through this trait.
///
/// # Example
///
/// ```rust,ignore
/// impl EntitySession for UnitOfWork {
///     fn session_id(&self) -> SessionId {
///         self.id
///     }
///
///     fn field_value(&self, token: EntityToken, field: &str) -> CoreResult<AppValue> {
///         let entity = self.managed(token)?;
///         entity.fields.get(field).cloned().ok_or_else(|| {
///             CoreError::unknown_field(&entity.entity_type, field)
///         })
///     }
///     // ...
/// }
/// ```
pub trait EntitySession {
    /// Identifier of this session.
    fn session_id(&self) -> SessionId;

    /// Field metadata for an entity type.
    fn metadata(&self, entity_type: &str) -> CoreResult<Arc<EntityMetadata>>;

    /// Field types used to convert values of this session's entities.
    fn field_types(&self) -> &TypeRegistry;

    /// Type name of a managed entity.
    fn entity_type(&self, token: EntityToken) -> CoreResult<String>;

    /// Current application value of a field.
    fn field_value(&self, token: EntityToken, field: &str) -> CoreResult<AppValue>;

    /// Assigns the application value of a field.
    fn set_field_value(&mut self, token: EntityToken, field: &str, value: AppValue)
        -> CoreResult<()>;

    /// Live entities grouped by type name.
    fn identity_map(&self) -> Vec<(String, Vec<EntityToken>)>;
}
