//! The ordered check battery
//!
//! Checks share one scratch database and run in declaration order, so later
//! checks see the rows earlier ones inserted. Every expectation is computed
//! by the harness from an unfiltered select, never taken from the adapter's
//! own answer to the query under test.

use qcert_core::{Record, SortKey, Table, Value, compare_by_keys};
use std::cmp::Ordering;

use crate::oracle::{first_difference, missing_generated_fields, records_equal};
use crate::{Check, CheckError, SuiteContext, ensure_check};

mod defaults;
mod delete;
mod filter;
mod group;
mod insert;
mod paginate;
mod query;
mod relations;
mod schema;
mod sort;
mod update;

/// Every check, in execution order
pub fn battery() -> Vec<Check<SuiteContext>> {
    vec![
        Check::new(
            "SCHEMA",
            "every context reports the expected table schema",
            "schema mismatch",
            schema::schemas_match,
        ),
        Check::new(
            "QUERY",
            "select on the empty car table returns no rows",
            "table was not empty",
            query::empty_table,
        ),
        Check::new(
            "INSERT",
            "insert a single car and read it back",
            "single insert",
            insert::single_car,
        ),
        Check::new(
            "INSERT",
            "insert a single car wrapped in an array",
            "array insert",
            insert::single_car_in_array,
        ),
        Check::new(
            "INSERT",
            "insert several cars with only required fields",
            "required-only insert",
            insert::required_only,
        ),
        Check::new(
            "INSERT",
            "insert cars carrying different optional fields",
            "heterogeneous insert",
            insert::mixed_optional,
        ),
        Check::new(
            "INSERT",
            "insert a randomized batch of cars",
            "randomized insert",
            insert::random_batch,
        ),
        Check::new(
            "QUERY",
            "select returns every inserted car",
            "select all",
            query::select_all,
        ),
        Check::new(
            "DEFAULTS",
            "inject owner ids from a registered counter",
            "counter default",
            defaults::owner_counter,
        ),
        Check::new(
            "DEFAULTS",
            "inject dealer ids from a registered token generator",
            "token default",
            defaults::dealer_token,
        ),
        Check::new(
            "DEFAULTS",
            "explicit values are not replaced by registered defaults",
            "explicit value overridden",
            defaults::explicit_value_kept,
        ),
        Check::new(
            "UPDATE",
            "update a whole car record by primary key",
            "keyed update",
            update::whole_record,
        ),
        Check::new(
            "UPDATE",
            "updating a missing key affects no rows",
            "missing key update",
            update::missing_key,
        ),
        Check::new(
            "UPDATE",
            "update cars matching a predicate",
            "predicate update",
            update::by_predicate,
        ),
        Check::new(
            "FILTER",
            "filter cars by equality",
            "equality filter",
            filter::equals,
        ),
        Check::new(
            "FILTER",
            "filter cars by less-than",
            "less-than filter",
            filter::less_than,
        ),
        Check::new(
            "FILTER",
            "filter cars by an inclusive range",
            "range filter",
            filter::between,
        ),
        Check::new(
            "FILTER",
            "filter cars by set membership",
            "membership filter",
            filter::membership,
        ),
        Check::new(
            "FILTER",
            "filter cars by nested AND/OR/NOT",
            "nested filter",
            filter::nested,
        ),
        Check::new(
            "SORT",
            "sort cars ascending by a single key",
            "ascending sort",
            sort::ascending,
        ),
        Check::new(
            "SORT",
            "sort cars descending by a single key",
            "descending sort",
            sort::descending,
        ),
        Check::new(
            "SORT",
            "sort cars by several keys",
            "multi-key sort",
            sort::multiple_keys,
        ),
        Check::new(
            "SORT",
            "null values sort together at one end",
            "null ordering",
            sort::null_placement,
        ),
        Check::new(
            "GROUP",
            "group cars by make with average mileage",
            "average by make",
            group::average_by_make,
        ),
        Check::new(
            "GROUP",
            "group cars by make and year with sum, count, min and max",
            "multi-key aggregates",
            group::aggregates_by_make_and_year,
        ),
        Check::new(
            "PAGINATE",
            "take limits the number of rows",
            "take",
            paginate::take,
        ),
        Check::new(
            "PAGINATE",
            "skip and take page through sorted rows",
            "skip and take",
            paginate::skip_and_take,
        ),
        Check::new(
            "PAGINATE",
            "skipping past the end yields no rows",
            "skip past end",
            paginate::past_end,
        ),
        Check::new(
            "RELATIONS",
            "link cars to owners",
            "car owner links",
            relations::car_owners,
        ),
        Check::new(
            "RELATIONS",
            "link cars to dealers",
            "car dealer links",
            relations::car_dealers,
        ),
        Check::new(
            "DELETE",
            "delete a car by primary key without cascading",
            "keyed delete",
            delete::by_key,
        ),
        Check::new(
            "DELETE",
            "delete cars matching a predicate",
            "predicate delete",
            delete::by_predicate,
        ),
    ]
}

/// Assert each output row is its input as stored, with generated fields filled
fn ensure_inserted(table: &Table, input: &[Record], output: &[Record]) -> Result<(), CheckError> {
    ensure_check!(
        input.len() == output.len(),
        "inserted {} records into {} but {} came back",
        input.len(),
        table.name(),
        output.len()
    );
    for (i, (sent, stored)) in input.iter().zip(output).enumerate() {
        if let Some(diff) = first_difference(sent, stored, &[]) {
            return Err(CheckError::assertion(format!("record {}: {}", i, diff)));
        }
        let missing = missing_generated_fields(table.schema(), stored);
        ensure_check!(
            missing.is_empty(),
            "record {} lacks generated fields {:?}",
            i,
            missing
        );
    }
    Ok(())
}

/// Unfiltered select; the harness's view of the full table
async fn all_rows(table: &Table) -> Result<Vec<Record>, CheckError> {
    Ok(table.select().fetch().await?)
}

fn primary_id(record: &Record) -> Result<Value, CheckError> {
    record
        .get("Id")
        .filter(|v| !v.is_null())
        .cloned()
        .ok_or_else(|| CheckError::assertion(format!("record has no Id: {}", record)))
}

fn ensure_sorted(rows: &[Record], keys: &[SortKey]) -> Result<(), CheckError> {
    for (i, pair) in rows.windows(2).enumerate() {
        ensure_check!(
            compare_by_keys(&pair[0], &pair[1], keys) != Ordering::Greater,
            "rows {} and {} are out of order: {} before {}",
            i,
            i + 1,
            pair[0],
            pair[1]
        );
    }
    Ok(())
}

fn ensure_same_rows(expected: &[Record], actual: &[Record]) -> Result<(), CheckError> {
    ensure_check!(
        crate::oracle::same_members(expected, actual, &["Id"]),
        "expected {} rows {:?}, got {} rows {:?}",
        expected.len(),
        ids(expected),
        actual.len(),
        ids(actual)
    );
    Ok(())
}

fn ids(rows: &[Record]) -> Vec<String> {
    rows.iter()
        .map(|r| r.get("Id").map(Value::to_string).unwrap_or_else(|| "?".into()))
        .collect()
}

fn ensure_equal_record(expected: &Record, actual: &Record) -> Result<(), CheckError> {
    ensure_check!(
        records_equal(expected, actual, &[]),
        "{}",
        first_difference(expected, actual, &[]).unwrap_or_default()
    );
    Ok(())
}
