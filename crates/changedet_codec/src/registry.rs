//! Lookup of field types by declared name.

use crate::error::{CodecError, CodecResult};
use crate::types::{BooleanType, DateTimeType, DateType, FieldType, IntegerType, StringType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maps declared type names (`"date"`, `"integer"`, ...) to field types.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<&'static str, Arc<dyn FieldType>>,
}

impl TypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in types.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(IntegerType));
        registry.register(Arc::new(BooleanType));
        registry.register(Arc::new(StringType));
        registry.register(Arc::new(DateType));
        registry.register(Arc::new(DateTimeType));
        registry
    }

    /// Registers a type under its own name, replacing any previous one.
    pub fn register(&mut self, field_type: Arc<dyn FieldType>) {
        self.types.insert(field_type.name(), field_type);
    }

    /// Looks up a type by name.
    pub fn get(&self, name: &str) -> CodecResult<&Arc<dyn FieldType>> {
        self.types
            .get(name)
            .ok_or_else(|| CodecError::unknown_type(name))
    }

    /// True when a type is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.types.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}
