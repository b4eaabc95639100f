//! Select, grouping, sorting, pagination and mutation specifications
//!
//! `SelectQuery::apply` is the reference evaluation of the contract:
//! filter, then group/aggregate, then sort, then skip, then take.

use serde::Serialize;
use std::cmp::Ordering;

use crate::{Predicate, Record, Value};

/// Sort direction; ascending unless marked otherwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One key of a (possibly composite) sort
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Compare two records on this key alone. Missing fields sort as NULL.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ord = a
            .get(&self.field)
            .unwrap_or(&Value::Null)
            .sort_cmp(b.get(&self.field).unwrap_or(&Value::Null));
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Compare two records under a composite key, consulting key `n + 1` only
/// when every earlier key compares equal.
pub fn compare_by_keys(a: &Record, b: &Record, keys: &[SortKey]) -> Ordering {
    keys.iter()
        .map(|key| key.compare(a, b))
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Aggregate function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AggregateKind {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateKind {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateKind::Count => "count",
            AggregateKind::Sum => "sum",
            AggregateKind::Avg => "avg",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
        }
    }
}

/// An aggregate computed over one field of each bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    pub kind: AggregateKind,
    pub field: String,
}

impl Aggregate {
    pub fn new(kind: AggregateKind, field: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
        }
    }

    pub fn count(field: impl Into<String>) -> Self {
        Self::new(AggregateKind::Count, field)
    }

    pub fn sum(field: impl Into<String>) -> Self {
        Self::new(AggregateKind::Sum, field)
    }

    pub fn avg(field: impl Into<String>) -> Self {
        Self::new(AggregateKind::Avg, field)
    }

    pub fn min(field: impl Into<String>) -> Self {
        Self::new(AggregateKind::Min, field)
    }

    pub fn max(field: impl Into<String>) -> Self {
        Self::new(AggregateKind::Max, field)
    }

    /// Synthetic output field name: `$<agg>_<field>`
    pub fn output_field(&self) -> String {
        format!("${}_{}", self.kind.name(), self.field)
    }

    /// Compute the aggregate over a bucket. NULL and missing values are skipped.
    pub fn compute(&self, rows: &[Record]) -> Value {
        let values: Vec<&Value> = rows
            .iter()
            .filter_map(|r| r.get(&self.field))
            .filter(|v| !v.is_null())
            .collect();

        match self.kind {
            AggregateKind::Count => Value::Int(values.len() as i64),
            AggregateKind::Sum => sum(&values),
            AggregateKind::Avg => {
                if values.is_empty() {
                    return Value::Null;
                }
                match sum(&values).as_f64() {
                    Some(total) => Value::Float(total / values.len() as f64),
                    None => Value::Null,
                }
            }
            AggregateKind::Min => extreme(&values, Ordering::Less),
            AggregateKind::Max => extreme(&values, Ordering::Greater),
        }
    }
}

/// Integer sums stay integral until they overflow, then widen to a float sum
fn sum(values: &[&Value]) -> Value {
    if values.iter().all(|v| matches!(v, Value::Int(_))) {
        let total = values
            .iter()
            .filter_map(|v| v.as_i64())
            .try_fold(0i64, i64::checked_add);
        if let Some(total) = total {
            return Value::Int(total);
        }
    }
    let numeric: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
    if numeric.len() != values.len() {
        return Value::Null;
    }
    Value::Float(numeric.iter().sum())
}

fn extreme(values: &[&Value], keep: Ordering) -> Value {
    values
        .iter()
        .copied()
        .reduce(|best, v| if v.sort_cmp(best) == keep { v } else { best })
        .cloned()
        .unwrap_or(Value::Null)
}

/// Grouping key plus the aggregates computed per bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupBy {
    pub keys: Vec<String>,
    pub aggregates: Vec<Aggregate>,
}

impl GroupBy {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            aggregates: Vec::new(),
        }
    }

    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregates.push(aggregate);
        self
    }

    /// Fields every output row carries: keys first, then aggregates
    pub fn output_fields(&self) -> Vec<String> {
        self.keys
            .iter()
            .cloned()
            .chain(self.aggregates.iter().map(Aggregate::output_field))
            .collect()
    }

    /// Partition rows into buckets keyed by the tuple of key values, in order
    /// of first appearance. Missing key fields group as NULL.
    pub fn partition(&self, rows: impl IntoIterator<Item = Record>) -> Vec<(Vec<Value>, Vec<Record>)> {
        let mut buckets: Vec<(Vec<Value>, Vec<Record>)> = Vec::new();
        for row in rows {
            let key: Vec<Value> = self
                .keys
                .iter()
                .map(|k| row.get(k).cloned().unwrap_or(Value::Null))
                .collect();
            match buckets.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, members)) => members.push(row),
                None => buckets.push((key, vec![row])),
            }
        }
        buckets
    }

    /// Produce one output record per bucket
    pub fn apply(&self, rows: impl IntoIterator<Item = Record>) -> Vec<Record> {
        self.partition(rows)
            .into_iter()
            .map(|(key, members)| {
                let mut out: Record = self.keys.iter().cloned().zip(key).collect();
                for aggregate in &self.aggregates {
                    out.insert(aggregate.output_field(), aggregate.compute(&members));
                }
                out
            })
            .collect()
    }
}

/// A fully specified select
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectQuery {
    pub filter: Option<Predicate>,
    pub group: Option<GroupBy>,
    pub sort: Vec<SortKey>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the query over a full table, returning the result rows.
    pub fn apply(&self, rows: impl IntoIterator<Item = Record>) -> Vec<Record> {
        let filtered = rows
            .into_iter()
            .filter(|r| self.filter.as_ref().is_none_or(|p| p.matches(r)));

        let mut out: Vec<Record> = match &self.group {
            Some(group) => group.apply(filtered),
            None => filtered.collect(),
        };

        if !self.sort.is_empty() {
            // Vec::sort_by is stable: ties keep their prior relative order.
            out.sort_by(|a, b| compare_by_keys(a, b, &self.sort));
        }

        out.into_iter()
            .skip(self.skip.unwrap_or(0))
            .take(self.take.unwrap_or(usize::MAX))
            .collect()
    }
}

/// Field assignments applied to every row matched by a predicate
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Mutation {
    assignments: Vec<(String, Value)>,
}

impl Mutation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((field.into(), value.into()));
        self
    }

    pub fn assignments(&self) -> &[(String, Value)] {
        &self.assignments
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Apply the assignments in order; later assignments to the same field win.
    pub fn apply_to(&self, record: &mut Record) {
        for (field, value) in &self.assignments {
            record.insert(field.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{field, record};
    use pretty_assertions::assert_eq;

    fn cars() -> Vec<Record> {
        vec![
            record! { "Id" => 1, "Make" => "Ford", "Year" => 2008, "Mileage" => 74999 },
            record! { "Id" => 2, "Make" => "Toyota", "Year" => 2012, "Mileage" => 30000 },
            record! { "Id" => 3, "Make" => "Ford", "Year" => 2015, "Mileage" => 25001 },
            record! { "Id" => 4, "Make" => "Dodge", "Year" => 2008, "Mileage" => 120000 },
        ]
    }

    fn ids(rows: &[Record]) -> Vec<i64> {
        rows.iter().filter_map(|r| r.get("Id").and_then(Value::as_i64)).collect()
    }

    #[test]
    fn test_multi_key_sort_breaks_ties_left_to_right() {
        let query = SelectQuery {
            sort: vec![SortKey::desc("Year"), SortKey::asc("Mileage")],
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(cars())), vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_single_key_sort_is_stable() {
        let query = SelectQuery {
            sort: vec![SortKey::asc("Make")],
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(cars())), vec![4, 1, 3, 2]);
    }

    #[test]
    fn test_group_by_emits_only_keys_and_aggregates() {
        let group = GroupBy::new(["Make"]).aggregate(Aggregate::avg("Mileage"));
        let rows = group.apply(cars());
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            record! { "Make" => "Ford", "$avg_Mileage" => 50000.0 }
        );
        assert_eq!(
            rows[2].fields().collect::<Vec<_>>(),
            vec!["Make", "$avg_Mileage"]
        );
    }

    #[test]
    fn test_aggregates_skip_nulls() {
        let rows = vec![
            record! { "Mileage" => 10 },
            record! { "Mileage" => Value::Null },
            record! { "Other" => 1 },
            record! { "Mileage" => 30 },
        ];
        assert_eq!(Aggregate::count("Mileage").compute(&rows), Value::Int(2));
        assert_eq!(Aggregate::sum("Mileage").compute(&rows), Value::Int(40));
        assert_eq!(Aggregate::avg("Mileage").compute(&rows), Value::Float(20.0));
        assert_eq!(Aggregate::min("Mileage").compute(&rows), Value::Int(10));
        assert_eq!(Aggregate::max("Mileage").compute(&rows), Value::Int(30));
        assert_eq!(Aggregate::avg("Missing").compute(&rows), Value::Null);
    }

    #[test]
    fn test_sum_of_mixed_numbers_is_float() {
        let rows = vec![record! { "MPG" => 20 }, record! { "MPG" => 22.5 }];
        assert_eq!(Aggregate::sum("MPG").compute(&rows), Value::Float(42.5));
    }

    #[test]
    fn test_integer_sum_overflow_widens_to_float() {
        let rows = vec![record! { "x" => i64::MAX }, record! { "x" => 1 }];
        assert_eq!(
            Aggregate::sum("x").compute(&rows),
            Value::Float(i64::MAX as f64 + 1.0)
        );

        let both = vec![record! { "x" => i64::MAX }, record! { "x" => i64::MAX }];
        assert_eq!(Aggregate::avg("x").compute(&both), Value::Float(i64::MAX as f64));
    }

    #[test]
    fn test_pipeline_order_filter_sort_skip_take() {
        let query = SelectQuery {
            filter: Some(field("Mileage").lt(100000)),
            sort: vec![SortKey::asc("Mileage")],
            skip: Some(1),
            take: Some(1),
            ..Default::default()
        };
        assert_eq!(ids(&query.apply(cars())), vec![2]);
    }

    #[test]
    fn test_skip_past_end_is_empty() {
        let query = SelectQuery {
            skip: Some(10),
            ..Default::default()
        };
        assert!(query.apply(cars()).is_empty());
    }

    #[test]
    fn test_mutation_last_assignment_wins() {
        let mut row = record! { "Model" => "Focus" };
        Mutation::new()
            .set("Model", "Fiesta")
            .set("Model", "Mondeo")
            .apply_to(&mut row);
        assert_eq!(row.get("Model"), Some(&Value::from("Mondeo")));
    }
}
