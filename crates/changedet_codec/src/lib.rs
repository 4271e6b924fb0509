//! # changedet codec
//!
//! Value models and field type codecs for changedet.
//!
//! This crate provides:
//! - [`AppValue`], the field value as the application holds it, including
//!   the shared mutable [`DateTimeCell`]
//! - [`Value`], the field value as the database stores it
//! - [`FieldType`], the pure conversion between the two, with built-in
//!   `integer`, `boolean`, `string`, `date` and `datetime` types
//! - [`TypeRegistry`] for looking types up by declared name
//!
//! ## Usage
//!
//! ```
//! use changedet_codec::{AppValue, TypeRegistry, Value};
//! use chrono::NaiveDate;
//!
//! let types = TypeRegistry::with_defaults();
//! let date = types.get("date").unwrap();
//!
//! let value = AppValue::date(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
//! assert_eq!(date.to_database_value(&value).unwrap(), Value::from("2000-01-01"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod app;
mod error;
mod registry;
mod types;
mod value;

pub use app::{AppValue, DateTimeCell};
pub use error::{CodecError, CodecResult};
pub use registry::TypeRegistry;
pub use types::{
    BooleanType, DateTimeType, DateType, FieldType, IntegerType, StringType, DATE_FORMAT,
    DATE_TIME_FORMAT,
};
pub use value::Value;
