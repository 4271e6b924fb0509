//! Application-level value type.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A shared, mutable date-time object.
///
/// Cloning a cell aliases the same object, so a mutation through one clone
/// is visible through every other. Comparison with [`DateTimeCell::ptr_eq`]
/// is by identity, which is how an entity session tells "same object" from
/// "new object". Two cells holding the same instant are still different
/// objects.
#[derive(Clone)]
pub struct DateTimeCell(Arc<Mutex<NaiveDateTime>>);

impl DateTimeCell {
    /// Creates a new date-time object.
    #[must_use]
    pub fn new(value: NaiveDateTime) -> Self {
        Self(Arc::new(Mutex::new(value)))
    }

    /// Creates a date-time object at midnight of `date`.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        Self::new(date.and_time(NaiveTime::MIN))
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> NaiveDateTime {
        *self.0.lock()
    }

    /// Returns the date part of the current value.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.get().date()
    }

    /// Replaces the value in place.
    pub fn set(&self, value: NaiveDateTime) {
        *self.0.lock() = value;
    }

    /// Moves the value by `days` in place.
    ///
    /// Returns the new value, or `None` if it would leave the representable
    /// range (the cell is left unchanged).
    pub fn shift_days(&self, days: i64) -> Option<NaiveDateTime> {
        let mut guard = self.0.lock();
        let shifted = if days >= 0 {
            guard.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            guard.checked_sub_days(Days::new(days.unsigned_abs()))
        }?;
        *guard = shifted;
        Some(shifted)
    }

    /// Replaces the time of day in place, keeping the date.
    pub fn set_time(&self, time: NaiveTime) {
        let mut guard = self.0.lock();
        *guard = guard.date().and_time(time);
    }

    /// Returns a new, independent object holding the same value.
    #[must_use]
    pub fn detached(&self) -> Self {
        Self::new(self.get())
    }

    /// True when both cells are the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for DateTimeCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DateTimeCell({})", self.get())
    }
}

/// A field value as the application holds it in memory.
#[derive(Debug, Clone)]
pub enum AppValue {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Owned string.
    Text(String),
    /// Mutable date-time object.
    DateTime(DateTimeCell),
}

impl AppValue {
    /// Wraps a fresh date-time object.
    #[must_use]
    pub fn date_time(value: NaiveDateTime) -> Self {
        AppValue::DateTime(DateTimeCell::new(value))
    }

    /// Wraps a fresh date-time object at midnight of `date`.
    #[must_use]
    pub fn date(date: NaiveDate) -> Self {
        AppValue::DateTime(DateTimeCell::from_date(date))
    }

    /// Host-native equality.
    ///
    /// Scalars compare by value. Date-time objects compare by identity: a
    /// new object holding an equal instant is *not* the same, and an object
    /// mutated in place still *is* the same.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (AppValue::Null, AppValue::Null) => true,
            (AppValue::Bool(a), AppValue::Bool(b)) => a == b,
            (AppValue::Integer(a), AppValue::Integer(b)) => a == b,
            (AppValue::Text(a), AppValue::Text(b)) => a == b,
            (AppValue::DateTime(a), AppValue::DateTime(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, AppValue::Null)
    }

    /// Get the date-time object, if this is one.
    pub fn as_date_time(&self) -> Option<&DateTimeCell> {
        match self {
            AppValue::DateTime(cell) => Some(cell),
            _ => None,
        }
    }

    /// Get this value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AppValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a string, if it is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AppValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AppValue::Null => "null",
            AppValue::Bool(_) => "boolean",
            AppValue::Integer(_) => "integer",
            AppValue::Text(_) => "text",
            AppValue::DateTime(_) => "date-time",
        }
    }
}

impl From<bool> for AppValue {
    fn from(b: bool) -> Self {
        AppValue::Bool(b)
    }
}

impl From<i64> for AppValue {
    fn from(n: i64) -> Self {
        AppValue::Integer(n)
    }
}

impl From<&str> for AppValue {
    fn from(s: &str) -> Self {
        AppValue::Text(s.to_string())
    }
}

impl From<String> for AppValue {
    fn from(s: String) -> Self {
        AppValue::Text(s)
    }
}

impl From<DateTimeCell> for AppValue {
    fn from(cell: DateTimeCell) -> Self {
        AppValue::DateTime(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn clones_alias_the_same_object() {
        let cell = DateTimeCell::from_date(day(2000, 1, 1));
        let alias = cell.clone();

        cell.shift_days(1).unwrap();

        assert_eq!(alias.date(), day(2000, 1, 2));
        assert!(cell.ptr_eq(&alias));
    }

    #[test]
    fn detached_copy_is_a_different_object() {
        let cell = DateTimeCell::from_date(day(2000, 1, 1));
        let copy = cell.detached();

        assert_eq!(cell.get(), copy.get());
        assert!(!cell.ptr_eq(&copy));
    }

    #[test]
    fn shift_days_both_directions() {
        let cell = DateTimeCell::from_date(day(2000, 1, 1));
        cell.shift_days(1).unwrap();
        cell.shift_days(-2).unwrap();
        assert_eq!(cell.date(), day(1999, 12, 31));
    }

    #[test]
    fn shift_out_of_range_leaves_value() {
        let cell = DateTimeCell::new(NaiveDateTime::MAX);
        assert!(cell.shift_days(1).is_none());
        assert_eq!(cell.get(), NaiveDateTime::MAX);
    }

    #[test]
    fn set_time_keeps_date() {
        let cell = DateTimeCell::from_date(day(2000, 1, 1));
        cell.set_time(NaiveTime::from_hms_opt(13, 30, 0).unwrap());
        assert_eq!(cell.date(), day(2000, 1, 1));
        assert_eq!(cell.get().time(), NaiveTime::from_hms_opt(13, 30, 0).unwrap());
    }

    #[test]
    fn same_is_identity_for_date_times() {
        let a = AppValue::date(day(2000, 1, 1));
        let b = AppValue::date(day(2000, 1, 1));

        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }

    #[test]
    fn same_is_value_equality_for_scalars() {
        assert!(AppValue::from(7i64).same(&AppValue::from(7i64)));
        assert!(AppValue::from("a").same(&AppValue::from("a".to_string())));
        assert!(AppValue::Null.same(&AppValue::Null));
        assert!(!AppValue::Null.same(&AppValue::from(false)));
        assert!(!AppValue::from(1i64).same(&AppValue::from("1")));
    }
}
