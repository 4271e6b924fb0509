//! A minimal unit of work driving the change detector.
//!
//! [`EntityManager`] loads rows into managed entities, tracks their
//! original values, and on flush writes every field whose current value is
//! not [`AppValue::same`] as the original. That is the host-native
//! dirty-check the detector corrects. The detector is optional so the same
//! script can run with and without it.

use crate::database::{MemoryDatabase, QueryLog, Row};
use crate::error::{HostError, HostResult};
use changedet_codec::{AppValue, DateTimeCell, TypeRegistry, Value};
use changedet_core::{
    ChangeDetector, CoreError, CoreResult, EntityMetadata, EntitySession, EntityToken, SessionId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// An entity enrolled in the unit of work.
#[derive(Debug, Clone)]
struct ManagedEntity {
    entity_type: String,
    id: Option<i64>,
    fields: HashMap<String, AppValue>,
    /// Values as of the last load or flush; empty for new entities.
    original: HashMap<String, AppValue>,
}

/// Managed entities, their metadata and originals.
///
/// This is the part of the host the detector sees through
/// [`EntitySession`].
#[derive(Debug)]
pub struct UnitOfWork {
    id: SessionId,
    types: TypeRegistry,
    metadata: HashMap<String, Arc<EntityMetadata>>,
    entities: BTreeMap<EntityToken, ManagedEntity>,
    identity: HashMap<(String, i64), EntityToken>,
    next_token: EntityToken,
}

impl UnitOfWork {
    fn new(types: TypeRegistry) -> Self {
        Self {
            id: SessionId::new(),
            types,
            metadata: HashMap::new(),
            entities: BTreeMap::new(),
            identity: HashMap::new(),
            next_token: EntityToken::new(1),
        }
    }

    fn enroll(&mut self, entity: ManagedEntity) -> EntityToken {
        let token = self.next_token;
        self.next_token = token.next();
        if let Some(id) = entity.id {
            self.identity.insert((entity.entity_type.clone(), id), token);
        }
        self.entities.insert(token, entity);
        token
    }

    fn managed(&self, token: EntityToken) -> CoreResult<&ManagedEntity> {
        self.entities
            .get(&token)
            .ok_or(CoreError::entity_not_managed(token))
    }

    /// Number of managed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if no entity is managed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntitySession for UnitOfWork {
    fn session_id(&self) -> SessionId {
        self.id
    }

    fn metadata(&self, entity_type: &str) -> CoreResult<Arc<EntityMetadata>> {
        self.metadata
            .get(entity_type)
            .cloned()
            .ok_or_else(|| CoreError::unknown_entity_type(entity_type))
    }

    fn field_types(&self) -> &TypeRegistry {
        &self.types
    }

    fn entity_type(&self, token: EntityToken) -> CoreResult<String> {
        Ok(self.managed(token)?.entity_type.clone())
    }

    fn field_value(&self, token: EntityToken, field: &str) -> CoreResult<AppValue> {
        let entity = self.managed(token)?;
        entity
            .fields
            .get(field)
            .cloned()
            .ok_or_else(|| CoreError::unknown_field(&entity.entity_type, field))
    }

    fn set_field_value(
        &mut self,
        token: EntityToken,
        field: &str,
        value: AppValue,
    ) -> CoreResult<()> {
        let entity = self
            .entities
            .get_mut(&token)
            .ok_or(CoreError::entity_not_managed(token))?;
        match entity.fields.get_mut(field) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(CoreError::unknown_field(&entity.entity_type, field)),
        }
    }

    fn identity_map(&self) -> Vec<(String, Vec<EntityToken>)> {
        let mut by_type: BTreeMap<&str, Vec<EntityToken>> = BTreeMap::new();
        for (token, entity) in &self.entities {
            by_type.entry(&entity.entity_type).or_default().push(*token);
        }
        by_type
            .into_iter()
            .map(|(ty, tokens)| (ty.to_string(), tokens))
            .collect()
    }
}

/// Entity manager over a [`MemoryDatabase`].
#[derive(Debug)]
pub struct EntityManager {
    db: MemoryDatabase,
    uow: UnitOfWork,
    detector: Option<ChangeDetector>,
}

impl EntityManager {
    /// Creates a manager without a change detector.
    #[must_use]
    pub fn new(types: TypeRegistry) -> Self {
        Self {
            db: MemoryDatabase::new(),
            uow: UnitOfWork::new(types),
            detector: None,
        }
    }

    /// Installs a change detector.
    #[must_use]
    pub fn with_detector(mut self, detector: ChangeDetector) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Registers an entity type and creates its table.
    pub fn register(&mut self, metadata: EntityMetadata) {
        self.db.create_table(metadata.table.clone());
        self.uow
            .metadata
            .insert(metadata.name.clone(), Arc::new(metadata));
    }

    /// The installed detector, if any.
    #[must_use]
    pub fn detector(&self) -> Option<&ChangeDetector> {
        self.detector.as_ref()
    }

    /// The unit of work.
    #[must_use]
    pub fn unit_of_work(&self) -> &UnitOfWork {
        &self.uow
    }

    /// The underlying database.
    #[must_use]
    pub fn database(&self) -> &MemoryDatabase {
        &self.db
    }

    /// The underlying database, for seeding rows.
    pub fn database_mut(&mut self) -> &mut MemoryDatabase {
        &mut self.db
    }

    /// The statement log.
    #[must_use]
    pub fn queries(&self) -> &QueryLog {
        self.db.log()
    }

    /// Forgets logged statements.
    pub fn reset_queries(&mut self) {
        self.db.reset_log();
    }

    /// Writes a row for `entity_type` directly, bypassing the log.
    ///
    /// `values` maps field names to stored values; unmapped fields are
    /// rejected.
    pub fn insert_row<'a, I>(&mut self, entity_type: &str, id: i64, values: I) -> HostResult<()>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let meta = self.uow.metadata(entity_type)?;
        let mut row = Row::new();
        for (field, value) in values {
            let mapping = meta
                .mapping(field)
                .ok_or_else(|| CoreError::unknown_field(&meta.name, field))?;
            row.insert(mapping.column.clone(), value);
        }
        self.db.seed(&meta.table, id, row)
    }

    /// Returns the managed entity for a row, loading it if needed.
    ///
    /// An entity already in the identity map is returned without a query.
    pub fn find(&mut self, entity_type: &str, id: i64) -> HostResult<Option<EntityToken>> {
        if let Some(token) = self.uow.identity.get(&(entity_type.to_string(), id)) {
            return Ok(Some(*token));
        }

        let meta = self.uow.metadata(entity_type)?;
        let Some(row) = self.db.select(&meta.table, id)? else {
            return Ok(None);
        };

        let mut fields = HashMap::with_capacity(meta.fields.len());
        for mapping in &meta.fields {
            let stored = row.get(&mapping.column).cloned().unwrap_or(Value::Null);
            let value = self
                .uow
                .types
                .get(&mapping.type_name)?
                .to_application_value(&stored)?;
            fields.insert(mapping.name.clone(), value);
        }

        let token = self.uow.enroll(ManagedEntity {
            entity_type: entity_type.to_string(),
            id: Some(id),
            original: fields.clone(),
            fields,
        });
        debug!(%token, entity_type, id, "loaded entity");

        if let Some(detector) = &mut self.detector {
            detector.post_load(&self.uow, token)?;
        }
        Ok(Some(token))
    }

    /// Enrolls a new entity to be inserted on the next flush.
    ///
    /// Fields not given are `Null`.
    pub fn persist<'a, I>(&mut self, entity_type: &str, values: I) -> HostResult<EntityToken>
    where
        I: IntoIterator<Item = (&'a str, AppValue)>,
    {
        let meta = self.uow.metadata(entity_type)?;
        let mut fields: HashMap<String, AppValue> = meta
            .fields
            .iter()
            .map(|mapping| (mapping.name.clone(), AppValue::Null))
            .collect();
        for (field, value) in values {
            match fields.get_mut(field) {
                Some(slot) => *slot = value,
                None => return Err(CoreError::unknown_field(entity_type, field).into()),
            }
        }

        Ok(self.uow.enroll(ManagedEntity {
            entity_type: entity_type.to_string(),
            id: None,
            fields,
            original: HashMap::new(),
        }))
    }

    /// Current value of a field.
    pub fn get(&self, token: EntityToken, field: &str) -> HostResult<AppValue> {
        Ok(self.uow.field_value(token, field)?)
    }

    /// Assigns a field.
    pub fn set(&mut self, token: EntityToken, field: &str, value: impl Into<AppValue>) -> HostResult<()> {
        Ok(self.uow.set_field_value(token, field, value.into())?)
    }

    /// The date-time object currently held by a field.
    ///
    /// Mutating the returned cell mutates the entity's value in place.
    pub fn date(&self, token: EntityToken, field: &str) -> HostResult<DateTimeCell> {
        self.get(token, field)?
            .as_date_time()
            .cloned()
            .ok_or_else(|| HostError::NotADateTime {
                field: field.to_string(),
            })
    }

    /// Database id of an entity, once inserted.
    pub fn id(&self, token: EntityToken) -> HostResult<Option<i64>> {
        Ok(self.uow.managed(token)?.id)
    }

    /// Writes pending changes.
    ///
    /// New entities are inserted with all fields. Managed entities get one
    /// `UPDATE` covering the fields whose value is not the same as the
    /// original; entities without such fields issue nothing.
    pub fn flush(&mut self) -> HostResult<()> {
        if let Some(detector) = &mut self.detector {
            detector.pre_flush(&mut self.uow)?;
        }

        let UnitOfWork {
            types,
            metadata,
            entities,
            identity,
            ..
        } = &mut self.uow;

        for (token, entity) in entities.iter_mut() {
            let meta = metadata
                .get(&entity.entity_type)
                .ok_or_else(|| CoreError::unknown_entity_type(&entity.entity_type))?;

            match entity.id {
                None => {
                    let mut row = Row::new();
                    for mapping in &meta.fields {
                        let value = entity.fields.get(&mapping.name).unwrap_or(&AppValue::Null);
                        let stored = types.get(&mapping.type_name)?.to_database_value(value)?;
                        row.insert(mapping.column.clone(), stored);
                    }
                    let id = self.db.insert(&meta.table, row)?;
                    entity.id = Some(id);
                    identity.insert((entity.entity_type.clone(), id), *token);
                    debug!(%token, id, "inserted entity");
                }
                Some(id) => {
                    let mut changes = Row::new();
                    for mapping in &meta.fields {
                        let current = entity.fields.get(&mapping.name).unwrap_or(&AppValue::Null);
                        let unchanged = entity
                            .original
                            .get(&mapping.name)
                            .is_some_and(|original| original.same(current));
                        if !unchanged {
                            let stored = types.get(&mapping.type_name)?.to_database_value(current)?;
                            changes.insert(mapping.column.clone(), stored);
                        }
                    }
                    if !changes.is_empty() {
                        self.db.update(&meta.table, id, changes)?;
                        debug!(%token, id, "updated entity");
                    }
                }
            }

            entity.original = entity.fields.clone();
        }

        if let Some(detector) = &mut self.detector {
            detector.post_flush(&self.uow)?;
        }
        Ok(())
    }

    /// Detaches every entity and resets the detector.
    pub fn clear(&mut self) {
        self.uow.entities.clear();
        self.uow.identity.clear();
        if let Some(detector) = &mut self.detector {
            detector.on_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use changedet_core::FieldMapping;

    fn manager() -> EntityManager {
        let mut em = EntityManager::new(TypeRegistry::with_defaults());
        em.register(
            EntityMetadata::new("Note", "note")
                .field(FieldMapping::new("title", "string"))
                .field(FieldMapping::new("pinned", "boolean")),
        );
        em
    }

    #[test]
    fn persist_then_flush_inserts_once() {
        let mut em = manager();
        let note = em.persist("Note", [("title", AppValue::from("a"))]).unwrap();

        em.flush().unwrap();
        em.flush().unwrap();

        assert_eq!(em.queries().writes(), 1);
        let id = em.id(note).unwrap().unwrap();
        assert_eq!(
            em.database().fetch_value("note", id, "title").unwrap(),
            Some(Value::from("a"))
        );
        assert_eq!(
            em.database().fetch_value("note", id, "pinned").unwrap(),
            Some(Value::Null)
        );
    }

    #[test]
    fn find_uses_identity_map() {
        let mut em = manager();
        em.insert_row("Note", 5, [("title", Value::from("x"))]).unwrap();

        let a = em.find("Note", 5).unwrap().unwrap();
        let b = em.find("Note", 5).unwrap().unwrap();

        assert_eq!(a, b);
        assert_eq!(em.queries().count(), 1);
        assert!(em.find("Note", 6).unwrap().is_none());
    }

    #[test]
    fn only_changed_scalars_are_updated() {
        let mut em = manager();
        em.insert_row("Note", 1, [("title", Value::from("x")), ("pinned", Value::Bool(false))])
            .unwrap();
        let note = em.find("Note", 1).unwrap().unwrap();
        em.reset_queries();

        em.set(note, "title", "x").unwrap();
        em.flush().unwrap();
        assert_eq!(em.queries().count(), 0);

        em.set(note, "pinned", true).unwrap();
        em.flush().unwrap();
        assert_eq!(
            em.queries().statements()[0].to_string(),
            "UPDATE note SET pinned = ? WHERE id = 1"
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut em = manager();
        let err = em.persist("Note", [("nope", AppValue::Null)]).unwrap_err();
        assert!(matches!(err, HostError::Core(CoreError::UnknownField { .. })));
    }

    #[test]
    fn clear_detaches_entities() {
        let mut em = manager();
        em.insert_row("Note", 1, [("title", Value::from("x"))]).unwrap();
        let note = em.find("Note", 1).unwrap().unwrap();

        em.clear();

        assert!(em.unit_of_work().is_empty());
        assert!(em.get(note, "title").is_err());
    }
}
