//! Field types: the codec between application and database values.

use crate::app::AppValue;
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime};

/// Storage format of the `date` type.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format of the `datetime` type.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A named conversion between an application value and its database form.
///
/// Both directions must be pure and deterministic: the same input always
/// produces an equal output, and nothing outside the arguments is read.
/// `Null` maps to `Null` both ways for every type.
pub trait FieldType: Send + Sync {
    /// Name the type is registered and declared under.
    fn name(&self) -> &'static str;

    /// Converts an application value to the value the database stores.
    fn to_database_value(&self, value: &AppValue) -> CodecResult<Value>;

    /// Converts a stored value to a freshly built application value.
    fn to_application_value(&self, value: &Value) -> CodecResult<AppValue>;
}

/// 64-bit integer column.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerType;

impl FieldType for IntegerType {
    fn name(&self) -> &'static str {
        "integer"
    }

    fn to_database_value(&self, value: &AppValue) -> CodecResult<Value> {
        match value {
            AppValue::Null => Ok(Value::Null),
            AppValue::Integer(n) => Ok(Value::Integer(*n)),
            other => Err(CodecError::type_mismatch(self.name(), "integer", other.kind())),
        }
    }

    fn to_application_value(&self, value: &Value) -> CodecResult<AppValue> {
        match value {
            Value::Null => Ok(AppValue::Null),
            Value::Integer(n) => Ok(AppValue::Integer(*n)),
            // some drivers hand integers back as text
            Value::Text(s) => s
                .parse()
                .map(AppValue::Integer)
                .map_err(|e| CodecError::invalid_value(self.name(), format!("{s:?}: {e}"))),
            other => Err(CodecError::type_mismatch(self.name(), "integer", other.kind())),
        }
    }
}

/// Boolean column.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanType;

impl FieldType for BooleanType {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn to_database_value(&self, value: &AppValue) -> CodecResult<Value> {
        match value {
            AppValue::Null => Ok(Value::Null),
            AppValue::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(CodecError::type_mismatch(self.name(), "boolean", other.kind())),
        }
    }

    fn to_application_value(&self, value: &Value) -> CodecResult<AppValue> {
        match value {
            Value::Null => Ok(AppValue::Null),
            Value::Bool(b) => Ok(AppValue::Bool(*b)),
            Value::Integer(0) => Ok(AppValue::Bool(false)),
            Value::Integer(1) => Ok(AppValue::Bool(true)),
            other => Err(CodecError::type_mismatch(self.name(), "boolean", other.kind())),
        }
    }
}

/// Text column.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl FieldType for StringType {
    fn name(&self) -> &'static str {
        "string"
    }

    fn to_database_value(&self, value: &AppValue) -> CodecResult<Value> {
        match value {
            AppValue::Null => Ok(Value::Null),
            AppValue::Text(s) => Ok(Value::Text(s.clone())),
            other => Err(CodecError::type_mismatch(self.name(), "text", other.kind())),
        }
    }

    fn to_application_value(&self, value: &Value) -> CodecResult<AppValue> {
        match value {
            Value::Null => Ok(AppValue::Null),
            Value::Text(s) => Ok(AppValue::Text(s.clone())),
            other => Err(CodecError::type_mismatch(self.name(), "text", other.kind())),
        }
    }
}

/// Calendar date column.
///
/// The application side is a full date-time object; only its date part is
/// stored. Two objects on the same day at different times therefore store
/// the same value. Decoding yields a new object at midnight.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateType;

impl FieldType for DateType {
    fn name(&self) -> &'static str {
        "date"
    }

    fn to_database_value(&self, value: &AppValue) -> CodecResult<Value> {
        match value {
            AppValue::Null => Ok(Value::Null),
            AppValue::DateTime(cell) => Ok(Value::Text(cell.date().format(DATE_FORMAT).to_string())),
            other => Err(CodecError::type_mismatch(self.name(), "date-time", other.kind())),
        }
    }

    fn to_application_value(&self, value: &Value) -> CodecResult<AppValue> {
        match value {
            Value::Null => Ok(AppValue::Null),
            Value::Text(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map(AppValue::date)
                .map_err(|e| CodecError::invalid_value(self.name(), format!("{s:?}: {e}"))),
            other => Err(CodecError::type_mismatch(self.name(), "text", other.kind())),
        }
    }
}

/// Date and time column, second precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeType;

impl FieldType for DateTimeType {
    fn name(&self) -> &'static str {
        "datetime"
    }

    fn to_database_value(&self, value: &AppValue) -> CodecResult<Value> {
        match value {
            AppValue::Null => Ok(Value::Null),
            AppValue::DateTime(cell) => {
                Ok(Value::Text(cell.get().format(DATE_TIME_FORMAT).to_string()))
            }
            other => Err(CodecError::type_mismatch(self.name(), "date-time", other.kind())),
        }
    }

    fn to_application_value(&self, value: &Value) -> CodecResult<AppValue> {
        match value {
            Value::Null => Ok(AppValue::Null),
            Value::Text(s) => NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT)
                .map(AppValue::date_time)
                .map_err(|e| CodecError::invalid_value(self.name(), format!("{s:?}: {e}"))),
            other => Err(CodecError::type_mismatch(self.name(), "text", other.kind())),
        }
    }
}
