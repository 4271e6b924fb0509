//! Entity field metadata as the host describes it.

use changedet_codec::Value;

/// Key of the opt-in flag inside a loosely typed option bag.
pub const DETECT_CHANGE_OPTION: &str = "detectChangeByDatabaseValue";

/// Typed per-field options relevant to change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldOptions {
    /// Compare this field by its database value instead of its
    /// application value.
    pub detect_change_by_database_value: bool,
}

impl FieldOptions {
    /// Options with database-value change detection turned on.
    #[must_use]
    pub const fn tracked() -> Self {
        Self {
            detect_change_by_database_value: true,
        }
    }

    /// Resolves options from a loosely typed `(name, value)` bag.
    ///
    /// Only `Value::Bool(true)` under [`DETECT_CHANGE_OPTION`] opts in. A
    /// missing key, `false`, or a value of any other kind leaves the field
    /// untracked. Unrelated keys are ignored.
    pub fn from_option_bag<'a, I>(options: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a Value)>,
    {
        let detect = options
            .into_iter()
            .find(|(name, _)| *name == DETECT_CHANGE_OPTION)
            .and_then(|(_, value)| value.as_bool())
            .unwrap_or(false);
        Self {
            detect_change_by_database_value: detect,
        }
    }
}

/// Mapping of one entity field to a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    /// Field name on the entity.
    pub name: String,
    /// Column name in the table.
    pub column: String,
    /// Registered field type name, used to pick the codec.
    pub type_name: String,
    /// Whether the column accepts `NULL`.
    pub nullable: bool,
    /// Change detection options.
    pub options: FieldOptions,
}

impl FieldMapping {
    /// Creates a mapping whose column has the same name as the field.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            type_name: type_name.into(),
            nullable: true,
            options: FieldOptions::default(),
        }
    }

    /// Sets the column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Sets whether the column is nullable.
    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the change detection options.
    #[must_use]
    pub fn options(mut self, options: FieldOptions) -> Self {
        self.options = options;
        self
    }

    /// Opts the field into database-value change detection.
    #[must_use]
    pub fn detect_change_by_database_value(self) -> Self {
        self.options(FieldOptions::tracked())
    }

    /// True if the field is compared by database value.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.options.detect_change_by_database_value
    }
}

/// Field metadata of one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetadata {
    /// Entity type name.
    pub name: String,
    /// Table the entity is stored in.
    pub table: String,
    /// Name of the generated integer identifier field.
    pub id_field: String,
    /// Mapped fields in declaration order, identifier excluded.
    pub fields: Vec<FieldMapping>,
}

impl EntityMetadata {
    /// Creates metadata with an `id` identifier and no fields.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            id_field: "id".to_string(),
            fields: Vec::new(),
        }
    }

    /// Sets the identifier field name.
    #[must_use]
    pub fn id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    /// Appends a field mapping.
    #[must_use]
    pub fn field(mut self, mapping: FieldMapping) -> Self {
        self.fields.push(mapping);
        self
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn mapping(&self, name: &str) -> Option<&FieldMapping> {
        self.fields.iter().find(|f| f.name == name)
    }
}
