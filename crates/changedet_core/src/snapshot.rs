//! Per-entity baselines in both representations.

use crate::token::EntityToken;
use changedet_codec::{AppValue, Value};
use std::collections::HashMap;

/// A field's value at the last observation, in both representations.
#[derive(Debug, Clone)]
pub struct ValueSnapshot {
    /// The value the entity held.
    pub application: AppValue,
    /// The same value converted by the field's type.
    pub stored: Value,
}

/// Snapshots keyed by entity token, then by field name.
///
/// An entry exists only after an observation of that field. No entry means
/// "do not reconcile".
#[derive(Debug, Default)]
pub struct SnapshotStore {
    entries: HashMap<EntityToken, HashMap<String, ValueSnapshot>>,
}

impl SnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records snapshots for an entity, replacing entries for the same
    /// fields and keeping the others.
    pub fn record<I>(&mut self, token: EntityToken, snapshots: I)
    where
        I: IntoIterator<Item = (String, ValueSnapshot)>,
    {
        let mut snapshots = snapshots.into_iter().peekable();
        if snapshots.peek().is_none() {
            return;
        }
        self.entries.entry(token).or_default().extend(snapshots);
    }

    /// Snapshot of one field.
    #[must_use]
    pub fn get(&self, token: EntityToken, field: &str) -> Option<&ValueSnapshot> {
        self.entries.get(&token)?.get(field)
    }

    /// All snapshots of one entity.
    #[must_use]
    pub fn fields(&self, token: EntityToken) -> Option<&HashMap<String, ValueSnapshot>> {
        self.entries.get(&token).filter(|fields| !fields.is_empty())
    }

    /// True if the entity has at least one snapshot.
    #[must_use]
    pub fn contains(&self, token: EntityToken) -> bool {
        self.fields(token).is_some()
    }

    /// Removes and returns the snapshots of one entity.
    pub fn remove(&mut self, token: EntityToken) -> Option<HashMap<String, ValueSnapshot>> {
        self.entries.remove(&token)
    }

    /// Number of entities with snapshots.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entries.len()
    }

    /// Total number of field snapshots.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    /// True if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
