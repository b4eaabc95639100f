//! Predicate tree
//!
//! Filters are explicit trees: comparison leaves joined by binary AND/OR
//! nodes. There is no operator precedence; the tree the caller builds is the
//! grouping that gets evaluated.
//!
//! ```
//! use qcert_core::field;
//!
//! // Make = 'Ford' AND (Year < 2000 OR Mileage BETWEEN 0 AND 1000)
//! let predicate = field("Make")
//!     .eq("Ford")
//!     .and(field("Year").lt(2000).or(field("Mileage").between(0, 1000)));
//! assert_eq!(predicate.depth(), 3);
//! ```

use serde::Serialize;
use std::cmp::Ordering;

use crate::{Record, Value};

/// Comparison applied to a single field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CompareOp {
    Eq(Value),
    Ne(Value),
    Lt(Value),
    Lte(Value),
    Gt(Value),
    Gte(Value),
    /// Inclusive on both bounds
    Between(Value, Value),
    In(Vec<Value>),
    IsNull,
    IsNotNull,
    /// Substring match on string fields
    Contains(String),
}

/// Composable boolean expression over record fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Predicate {
    Compare { field: String, op: CompareOp },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

/// Entry point of the fluent builder: names the field a comparison applies to
#[derive(Debug, Clone)]
pub struct Field(String);

/// Start a comparison on `name`
pub fn field(name: impl Into<String>) -> Field {
    Field(name.into())
}

impl Field {
    pub fn name(&self) -> &str {
        &self.0
    }

    fn compare(self, op: CompareOp) -> Predicate {
        Predicate::Compare { field: self.0, op }
    }

    pub fn eq(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Eq(value.into()))
    }

    pub fn ne(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Ne(value.into()))
    }

    pub fn lt(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Lt(value.into()))
    }

    pub fn lte(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Lte(value.into()))
    }

    pub fn gt(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Gt(value.into()))
    }

    pub fn gte(self, value: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Gte(value.into()))
    }

    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Predicate {
        self.compare(CompareOp::Between(low.into(), high.into()))
    }

    pub fn in_<I, V>(self, values: I) -> Predicate
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.compare(CompareOp::In(values.into_iter().map(Into::into).collect()))
    }

    pub fn is_null(self) -> Predicate {
        self.compare(CompareOp::IsNull)
    }

    pub fn is_not_null(self) -> Predicate {
        self.compare(CompareOp::IsNotNull)
    }

    pub fn contains(self, needle: impl Into<String>) -> Predicate {
        self.compare(CompareOp::Contains(needle.into()))
    }
}

impl Predicate {
    /// `self AND rhs`
    pub fn and(self, rhs: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(rhs))
    }

    /// `self OR rhs`
    pub fn or(self, rhs: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(rhs))
    }

    /// `NOT self`
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// Nesting depth; a single comparison has depth 1
    pub fn depth(&self) -> usize {
        match self {
            Predicate::Compare { .. } => 1,
            Predicate::And(l, r) | Predicate::Or(l, r) => 1 + l.depth().max(r.depth()),
            Predicate::Not(inner) => 1 + inner.depth(),
        }
    }

    /// Every field name referenced by the tree, in visit order, deduplicated
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Compare { field, .. } => {
                if !out.contains(&field.as_str()) {
                    out.push(field);
                }
            }
            Predicate::And(l, r) | Predicate::Or(l, r) => {
                l.collect_fields(out);
                r.collect_fields(out);
            }
            Predicate::Not(inner) => inner.collect_fields(out),
        }
    }

    /// Evaluate the predicate against a record.
    ///
    /// A missing or NULL field fails every comparison except `IsNull`;
    /// `Eq(Null)` is read as `IsNull`. Incomparable values never match.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::And(l, r) => l.matches(record) && r.matches(record),
            Predicate::Or(l, r) => l.matches(record) || r.matches(record),
            Predicate::Not(inner) => !inner.matches(record),
            Predicate::Compare { field, op } => eval_compare(record.get(field), op),
        }
    }
}

fn eval_compare(actual: Option<&Value>, op: &CompareOp) -> bool {
    let actual = match actual {
        None | Some(Value::Null) => {
            return matches!(op, CompareOp::IsNull | CompareOp::Eq(Value::Null));
        }
        Some(v) => v,
    };

    let ord = |expected: &Value| actual.compare(expected);

    match op {
        CompareOp::Eq(expected) => ord(expected) == Some(Ordering::Equal),
        CompareOp::Ne(expected) => {
            matches!(ord(expected), Some(Ordering::Less | Ordering::Greater))
        }
        CompareOp::Lt(expected) => ord(expected) == Some(Ordering::Less),
        CompareOp::Lte(expected) => {
            matches!(ord(expected), Some(Ordering::Less | Ordering::Equal))
        }
        CompareOp::Gt(expected) => ord(expected) == Some(Ordering::Greater),
        CompareOp::Gte(expected) => {
            matches!(ord(expected), Some(Ordering::Greater | Ordering::Equal))
        }
        CompareOp::Between(low, high) => {
            matches!(ord(low), Some(Ordering::Greater | Ordering::Equal))
                && matches!(ord(high), Some(Ordering::Less | Ordering::Equal))
        }
        CompareOp::In(set) => set.iter().any(|v| ord(v) == Some(Ordering::Equal)),
        CompareOp::IsNull => false,
        CompareOp::IsNotNull => true,
        CompareOp::Contains(needle) => actual
            .as_str()
            .is_some_and(|s| s.contains(needle.as_str())),
    }
}
