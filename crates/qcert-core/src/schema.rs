//! Runtime schema descriptions

use chrono::Utc;
use indexmap::IndexMap;
use rand::{Rng, distributions::Alphanumeric};
use serde::Serialize;

use crate::Value;

/// Scalar datatype tag of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataType {
    Int,
    Float,
    String { max_len: Option<usize> },
    Bool,
    DateTime,
}

impl DataType {
    /// Shorthand for a bounded string column
    pub fn varchar(max_len: usize) -> Self {
        DataType::String {
            max_len: Some(max_len),
        }
    }

    /// Whether a non-null value can be stored in a column of this type.
    ///
    /// Float columns accept integers; string columns enforce `max_len` in
    /// characters.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (DataType::Int, Value::Int(_)) => true,
            (DataType::Float, Value::Float(_) | Value::Int(_)) => true,
            (DataType::String { max_len }, Value::String(s)) => {
                max_len.is_none_or(|max| s.chars().count() <= max)
            }
            (DataType::Bool, Value::Bool(_)) => true,
            (DataType::DateTime, Value::DateTime(_)) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Int => write!(f, "INT"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::String { max_len: Some(n) } => write!(f, "VARCHAR({})", n),
            DataType::String { max_len: None } => write!(f, "TEXT"),
            DataType::Bool => write!(f, "BOOL"),
            DataType::DateTime => write!(f, "DATETIME"),
        }
    }
}

/// Nullary default-value provider declared on a column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DefaultValue {
    /// Always the same value
    Constant(Value),
    /// Next value of a per-table counter, assigned by the adapter
    AutoIncrement,
    /// Time of insertion
    CurrentTimestamp,
    /// Random alphanumeric token of fixed length
    Token { len: usize },
}

impl DefaultValue {
    /// Produce a value from this provider.
    ///
    /// `AutoIncrement` depends on table state and returns `None`; the
    /// adapter owning the table assigns it.
    pub fn produce(&self) -> Option<Value> {
        match self {
            DefaultValue::Constant(v) => Some(v.clone()),
            DefaultValue::AutoIncrement => None,
            DefaultValue::CurrentTimestamp => Some(Value::DateTime(Utc::now().naive_utc())),
            DefaultValue::Token { len } => Some(Value::String(
                rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(*len)
                    .map(char::from)
                    .collect(),
            )),
        }
    }

    /// Compare two providers by what they produce rather than by identity.
    ///
    /// Constants must produce equal values and tokens equal lengths; the
    /// state- and time-dependent providers match on kind.
    pub fn behaves_like(&self, other: &DefaultValue) -> bool {
        match (self, other) {
            (DefaultValue::Constant(_), DefaultValue::Constant(_)) => {
                match (self.produce(), other.produce()) {
                    (Some(a), Some(b)) => a.loosely_equals(&b),
                    _ => false,
                }
            }
            (DefaultValue::Token { .. }, DefaultValue::Token { .. }) => {
                let a = self.produce().and_then(|v| v.as_str().map(|s| s.chars().count()));
                let b = other.produce().and_then(|v| v.as_str().map(|s| s.chars().count()));
                a == b
            }
            (DefaultValue::AutoIncrement, DefaultValue::AutoIncrement) => true,
            (DefaultValue::CurrentTimestamp, DefaultValue::CurrentTimestamp) => true,
            _ => false,
        }
    }
}

/// Description of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    /// Owning table
    pub table: String,
    /// Field name as stored
    pub field: String,
    /// Name the field is exposed under
    pub alias: String,
    pub is_primary: bool,
    pub is_identity: bool,
    pub is_virtual: bool,
    pub is_nullable: bool,
    pub is_unique: bool,
    pub datatype: DataType,
    pub default: Option<DefaultValue>,
}

impl FieldDescriptor {
    /// Create a plain, required, non-key column whose alias is its name
    pub fn new(table: impl Into<String>, field: impl Into<String>, datatype: DataType) -> Self {
        let field = field.into();
        Self {
            table: table.into(),
            alias: field.clone(),
            field,
            is_primary: false,
            is_identity: false,
            is_virtual: false,
            is_nullable: false,
            is_unique: false,
            datatype,
            default: None,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn identity(mut self) -> Self {
        self.is_identity = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn virtual_field(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Whether the adapter is expected to populate this field when the
    /// caller omits it.
    pub fn is_generated(&self) -> bool {
        self.is_identity || self.default.is_some()
    }

    /// Whether an insert must supply this field (or have it injected).
    pub fn is_required(&self) -> bool {
        !self.is_nullable && !self.is_generated() && !self.is_virtual
    }
}

/// Field name to descriptor mapping for one table.
///
/// Equality between schemas is decided by the oracle, field by field, so the
/// declaration order carries no meaning beyond display.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    fields: IndexMap<String, FieldDescriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column declaration
    pub fn with(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.insert(descriptor.field.clone(), descriptor);
        self
    }

    pub fn get(&self, field: &str) -> Option<&FieldDescriptor> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Primary key columns in declaration order (composite keys allowed)
    pub fn primary_key(&self) -> Vec<&FieldDescriptor> {
        self.fields.values().filter(|f| f.is_primary).collect()
    }

    /// Identity or defaulted columns the adapter populates on insert
    pub fn generated_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values().filter(|f| f.is_generated())
    }
}
