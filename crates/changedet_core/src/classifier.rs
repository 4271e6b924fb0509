//! Per-type classification of opted-in fields.

use crate::metadata::EntityMetadata;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Caches, per entity type, which fields are compared by database value.
///
/// Each type is scanned once. Types with at least one opted-in field are
/// kept with their field names in declaration order; types with none are
/// kept in a separate set so the common "nothing to do" answer needs no
/// metadata at all.
#[derive(Debug, Default)]
pub struct FieldClassifier {
    concerned: HashMap<String, Arc<[String]>>,
    not_concerned: HashSet<String>,
}

impl FieldClassifier {
    /// Creates an empty classifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the type was already scanned and has no opted-in field.
    #[must_use]
    pub fn is_not_concerned(&self, entity_type: &str) -> bool {
        self.not_concerned.contains(entity_type)
    }

    /// Returns the opted-in field names of `metadata`'s type.
    ///
    /// `None` means the type has no opted-in field. The first call for a
    /// type scans `metadata`; later calls answer from the cache and ignore
    /// the argument's fields.
    pub fn classify(&mut self, metadata: &EntityMetadata) -> Option<Arc<[String]>> {
        if self.not_concerned.contains(&metadata.name) {
            return None;
        }
        if let Some(fields) = self.concerned.get(&metadata.name) {
            return Some(Arc::clone(fields));
        }

        let fields: Vec<String> = metadata
            .fields
            .iter()
            .filter(|mapping| mapping.is_tracked())
            .map(|mapping| mapping.name.clone())
            .collect();

        if fields.is_empty() {
            self.not_concerned.insert(metadata.name.clone());
            return None;
        }

        let fields: Arc<[String]> = fields.into();
        self.concerned
            .insert(metadata.name.clone(), Arc::clone(&fields));
        Some(fields)
    }

    /// Number of types classified so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.concerned.len() + self.not_concerned.len()
    }

    /// True if no type has been classified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every classification.
    pub fn clear(&mut self) {
        self.concerned.clear();
        self.not_concerned.clear();
    }
}
