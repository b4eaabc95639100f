//! Structural and schema equality used to decide pass or fail

use qcert_core::{DefaultValue, FieldDescriptor, Record, Schema, Value};
use std::fmt;

#[cfg(test)]
mod tests;

/// Scalar equality; integers equal floats of the same numeric value
pub fn values_equal(expected: &Value, actual: &Value) -> bool {
    expected.loosely_equals(actual)
}

/// Subset equality: every field of `expected` outside `ignore_keys` must be
/// present in `actual` with an equal value. Extra fields in `actual` are
/// ignored.
pub fn records_equal(expected: &Record, actual: &Record, ignore_keys: &[&str]) -> bool {
    expected
        .iter()
        .filter(|(field, _)| !ignore_keys.contains(field))
        .all(|(field, value)| actual.get(field).is_some_and(|a| values_equal(value, a)))
}

/// First field on which `records_equal` fails, for fail messages
pub fn first_difference(expected: &Record, actual: &Record, ignore_keys: &[&str]) -> Option<String> {
    expected
        .iter()
        .filter(|(field, _)| !ignore_keys.contains(field))
        .find_map(|(field, value)| match actual.get(field) {
            None => Some(format!("field '{}' missing, expected {}", field, value)),
            Some(a) if !values_equal(value, a) => {
                Some(format!("field '{}' is {}, expected {}", field, a, value))
            }
            Some(_) => None,
        })
}

/// Identity and defaulted fields of `schema` that `record` lacks or holds as NULL
pub fn missing_generated_fields(schema: &Schema, record: &Record) -> Vec<String> {
    schema
        .generated_fields()
        .filter(|d| record.get(&d.field).is_none_or(Value::is_null))
        .map(|d| d.field.clone())
        .collect()
}

/// Order-independent comparison of two row sets matched on `key` fields.
///
/// Both sides must hold the same number of rows and every expected row must
/// have a partner in `actual` with the same key that satisfies
/// [`records_equal`].
pub fn same_members(expected: &[Record], actual: &[Record], key: &[&str]) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    let mut unmatched: Vec<&Record> = actual.iter().collect();
    for row in expected {
        let position = unmatched.iter().position(|candidate| {
            key.iter().all(|k| match (row.get(k), candidate.get(k)) {
                (Some(a), Some(b)) => values_equal(a, b),
                _ => false,
            })
        });
        match position {
            Some(i) if records_equal(row, unmatched[i], &[]) => {
                unmatched.swap_remove(i);
            }
            _ => return false,
        }
    }
    true
}

/// One way an actual schema departs from the expected one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaMismatch {
    MissingField(String),
    Attribute {
        field: String,
        attribute: &'static str,
        expected: String,
        actual: String,
    },
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaMismatch::MissingField(field) => write!(f, "field '{}' is missing", field),
            SchemaMismatch::Attribute {
                field,
                attribute,
                expected,
                actual,
            } => write!(
                f,
                "field '{}': {} is {}, expected {}",
                field, attribute, actual, expected
            ),
        }
    }
}

/// Every mismatch between `expected` and `actual`, in expected field order.
///
/// Fields present only in `actual` are not reported.
pub fn schema_diff(expected: &Schema, actual: &Schema) -> Vec<SchemaMismatch> {
    let mut mismatches = Vec::new();
    for want in expected.iter() {
        match actual.get(&want.field) {
            None => mismatches.push(SchemaMismatch::MissingField(want.field.clone())),
            Some(have) => descriptor_diff(want, have, &mut mismatches),
        }
    }
    mismatches
}

pub fn schema_equal(expected: &Schema, actual: &Schema) -> bool {
    schema_diff(expected, actual).is_empty()
}

fn descriptor_diff(want: &FieldDescriptor, have: &FieldDescriptor, out: &mut Vec<SchemaMismatch>) {
    let mut check = |attribute: &'static str, expected: String, actual: String| {
        if expected != actual {
            out.push(SchemaMismatch::Attribute {
                field: want.field.clone(),
                attribute,
                expected,
                actual,
            });
        }
    };

    check("table", want.table.clone(), have.table.clone());
    check("alias", want.alias.clone(), have.alias.clone());
    check("is_primary", want.is_primary.to_string(), have.is_primary.to_string());
    check("is_identity", want.is_identity.to_string(), have.is_identity.to_string());
    check("is_virtual", want.is_virtual.to_string(), have.is_virtual.to_string());
    check("is_nullable", want.is_nullable.to_string(), have.is_nullable.to_string());
    check("is_unique", want.is_unique.to_string(), have.is_unique.to_string());
    check("datatype", want.datatype.to_string(), have.datatype.to_string());

    let defaults_match = match (&want.default, &have.default) {
        (None, None) => true,
        (Some(a), Some(b)) => a.behaves_like(b),
        _ => false,
    };
    if !defaults_match {
        out.push(SchemaMismatch::Attribute {
            field: want.field.clone(),
            attribute: "default",
            expected: describe_default(want.default.as_ref()),
            actual: describe_default(have.default.as_ref()),
        });
    }
}

fn describe_default(default: Option<&DefaultValue>) -> String {
    match default {
        None => "none".to_string(),
        Some(DefaultValue::Constant(v)) => format!("constant {}", v),
        Some(DefaultValue::AutoIncrement) => "auto increment".to_string(),
        Some(DefaultValue::CurrentTimestamp) => "current timestamp".to_string(),
        Some(DefaultValue::Token { len }) => format!("token({})", len),
    }
}
