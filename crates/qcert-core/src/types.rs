//! Scalar values and records

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;

/// A scalar field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Date and time without timezone
    DateTime(NaiveDateTime),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Try to get as f64, widening integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as a datetime
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Name of the value's variant, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
        }
    }

    /// Compare two values under their natural ordering.
    ///
    /// Integers and floats compare numerically with each other. Returns `None`
    /// when either side is NULL or the variants are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Scalar equality that treats `Int(n)` and `Float(n.0)` as equal.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => {
                self.compare(other) == Some(Ordering::Equal)
            }
            _ => self == other,
        }
    }

    /// Rank used to order values of different variants against each other.
    fn sort_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::DateTime(_) => 4,
        }
    }

    /// Total ordering used for sorting: NULL first, then natural ordering,
    /// falling back to variant rank for incomparable pairs.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            _ => self
                .compare(other)
                .unwrap_or_else(|| self.sort_rank().cmp(&other.sort_rank())),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "\"{}\"", v),
            Value::DateTime(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One row: field name to value, in insertion order.
///
/// A field that was never set is absent, which is distinct from a field
/// explicitly holding `Value::Null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Builder-style field assignment
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Set a field, returning the previous value if any
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Check whether the field is present (including explicit NULL)
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Remove a field, keeping the order of the remaining fields
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.shift_remove(field)
    }

    /// Field names in order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate over `(field, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `other` on top of this record; `other` wins on key collision.
    pub fn merge(&mut self, other: &Record) {
        for (field, value) in other.iter() {
            self.0.insert(field.to_string(), value.clone());
        }
    }

    /// Keep only the given fields, in the given order
    pub fn project(&self, fields: &[&str]) -> Record {
        fields
            .iter()
            .filter_map(|f| self.0.get(*f).map(|v| (f.to_string(), v.clone())))
            .collect()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (field, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field, value)?;
        }
        write!(f, "}}")
    }
}

/// Build a [`Record`] from `field => value` pairs.
///
/// ```
/// use qcert_core::{record, Value};
///
/// let car = record! { "Make" => "Ford", "Year" => 2008 };
/// assert_eq!(car.get("Year"), Some(&Value::Int(2008)));
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($field:expr => $value:expr),+ $(,)?) => {
        $crate::Record::new()$(.with($field, $value))+
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_numeric_comparison_crosses_int_and_float() {
        assert_eq!(Value::Int(2).compare(&Value::Float(2.5)), Some(Ordering::Less));
        assert!(Value::Int(3).loosely_equals(&Value::Float(3.0)));
        assert!(!Value::Int(3).loosely_equals(&Value::Float(3.1)));
    }

    #[test]
    fn test_null_is_incomparable_but_sorts_first() {
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
        assert_eq!(Value::Null.sort_cmp(&Value::Int(-100)), Ordering::Less);
        assert_eq!(Value::Int(1).sort_cmp(&Value::Null), Ordering::Greater);
    }

    #[test]
    fn test_datetime_ordering() {
        let early = NaiveDate::from_ymd_opt(2001, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let late = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            Value::from(early).compare(&Value::from(late)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_record_merge_override_wins() {
        let mut base = record! { "Make" => "Ford", "Year" => 2008 };
        base.merge(&record! { "Year" => 2010, "Model" => "Focus" });
        assert_eq!(base.get("Year"), Some(&Value::Int(2010)));
        assert_eq!(base.get("Model"), Some(&Value::from("Focus")));
        assert_eq!(base.fields().collect::<Vec<_>>(), vec!["Make", "Year", "Model"]);
    }

    #[test]
    fn test_absent_differs_from_null() {
        let record = record! { "MPGCity" => Value::Null };
        assert!(record.contains("MPGCity"));
        assert!(!record.contains("MPGHwy"));
    }

    #[test]
    fn test_project_keeps_requested_order() {
        let record = record! { "A" => 1, "B" => 2, "C" => 3 };
        let projected = record.project(&["C", "A", "Z"]);
        assert_eq!(projected.fields().collect::<Vec<_>>(), vec!["C", "A"]);
    }

    #[test]
    fn test_record_serializes_as_plain_object() {
        let record = record! { "Make" => "Ford", "MPGCity" => 24.5, "Sold" => false };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"Make":"Ford","MPGCity":24.5,"Sold":false}"#);
    }
}
