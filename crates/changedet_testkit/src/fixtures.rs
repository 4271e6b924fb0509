//! Test fixtures and entity manager helpers.
//!
//! Provides the entity type used by the end-to-end scenarios and managers
//! set up with and without a change detector.

use changedet_codec::{AppValue, DateTimeCell, TypeRegistry, Value};
use changedet_core::{ChangeDetector, Config, EntityMetadata, FieldMapping, FieldOptions, DETECT_CHANGE_OPTION};
use chrono::NaiveDate;

use crate::manager::EntityManager;

/// Entity type name of the test entity.
pub const TEST_ENTITY: &str = "TestEntity";

/// Table the test entity is stored in.
pub const TEST_TABLE: &str = "test_entity";

/// Untracked date field.
pub const DATE_BY_REF: &str = "date_by_ref";

/// Date field opted into database-value change detection.
pub const DATE_BY_VALUE: &str = "date_by_value";

/// Metadata of the test entity.
///
/// Both fields are `date` columns. Only [`DATE_BY_VALUE`] carries the
/// opt-in flag, resolved from an option bag the way a mapping driver
/// would hand it over.
pub fn test_entity_metadata() -> EntityMetadata {
    let opt_in = Value::Bool(true);
    EntityMetadata::new(TEST_ENTITY, TEST_TABLE)
        .field(FieldMapping::new(DATE_BY_REF, "date").column("date_by_ref"))
        .field(
            FieldMapping::new(DATE_BY_VALUE, "date")
                .column("date_by_value")
                .options(FieldOptions::from_option_bag([(DETECT_CHANGE_OPTION, &opt_in)])),
        )
}

/// A manager with the test entity registered and a default detector.
pub fn entity_manager() -> EntityManager {
    entity_manager_with_config(Config::default())
}

/// A manager with the test entity registered and a detector using `config`.
pub fn entity_manager_with_config(config: Config) -> EntityManager {
    let mut em = EntityManager::new(TypeRegistry::with_defaults())
        .with_detector(ChangeDetector::new(config));
    em.register(test_entity_metadata());
    em
}

/// A manager with the test entity registered and no detector.
pub fn entity_manager_without_detector() -> EntityManager {
    let mut em = EntityManager::new(TypeRegistry::with_defaults());
    em.register(test_entity_metadata());
    em
}

/// Midnight of the given day as a fresh date-time object.
///
/// # Panics
///
/// Panics if the date is invalid.
pub fn date(year: i32, month: u32, day: u32) -> DateTimeCell {
    let day = NaiveDate::from_ymd_opt(year, month, day).expect("invalid test date");
    DateTimeCell::from_date(day)
}

/// [`date`] wrapped as a field value.
///
/// # Panics
///
/// Panics if the date is invalid.
pub fn date_value(year: i32, month: u32, day: u32) -> AppValue {
    AppValue::from(date(year, month, day))
}

/// Seeds a test entity row with both dates set to `stored`, e.g. `"2000-01-01"`.
pub fn seed_test_entity(em: &mut EntityManager, id: i64, stored: &str) -> crate::HostResult<()> {
    em.insert_row(
        TEST_ENTITY,
        id,
        [(DATE_BY_REF, Value::from(stored)), (DATE_BY_VALUE, Value::from(stored))],
    )
}
