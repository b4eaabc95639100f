use futures::FutureExt;
use futures::future::BoxFuture;
use qcert_core::{Aggregate, Record, Value};

use super::all_rows;
use crate::oracle::values_equal;
use crate::{CheckError, CheckResult, SuiteContext, ensure_check};

type Bucket<'a> = (Vec<Value>, Vec<&'a Record>);

/// Partition `rows` by the tuple of `keys`, missing keys reading as NULL
fn buckets<'a>(rows: &'a [Record], keys: &[&str]) -> Vec<Bucket<'a>> {
    let mut out: Vec<Bucket<'a>> = Vec::new();
    for row in rows {
        let key: Vec<Value> = keys
            .iter()
            .map(|k| row.get(k).cloned().unwrap_or(Value::Null))
            .collect();
        match out.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(row),
            None => out.push((key, vec![row])),
        }
    }
    out
}

fn numbers(members: &[&Record], field: &str) -> Vec<f64> {
    members
        .iter()
        .filter_map(|r| r.get(field).and_then(Value::as_f64))
        .collect()
}

fn ensure_number(row: &Record, field: &str, expected: f64) -> Result<(), CheckError> {
    let actual = row.get(field).and_then(Value::as_f64);
    let close = actual.is_some_and(|a| (a - expected).abs() <= 1e-6 * expected.abs().max(1.0));
    ensure_check!(close, "{} is {:?}, expected {} in {}", field, actual, expected, row);
    Ok(())
}

/// Check the output shape and bucket set; returns each output row with its
/// independently computed bucket.
fn match_buckets<'r, 'a>(
    output: &'r [Record],
    expected: &[Bucket<'a>],
    keys: &[&str],
    aggregates: &[Aggregate],
) -> Result<Vec<(&'r Record, Vec<&'a Record>)>, CheckError> {
    let mut fields: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    fields.extend(aggregates.iter().map(Aggregate::output_field));
    ensure_check!(
        output.len() == expected.len(),
        "{} groups returned, {} distinct keys exist",
        output.len(),
        expected.len()
    );

    let mut matched = Vec::with_capacity(output.len());
    let mut unclaimed: Vec<&Bucket<'a>> = expected.iter().collect();
    for row in output {
        ensure_check!(
            row.len() == fields.len() && fields.iter().all(|f| row.contains(f)),
            "group row has fields {:?}, expected {:?}",
            row.fields().collect::<Vec<_>>(),
            fields
        );
        let position = unclaimed.iter().position(|(key, _)| {
            keys.iter()
                .zip(key)
                .all(|(k, v)| row.get(k).is_some_and(|actual| values_equal(v, actual)))
        });
        let Some(position) = position else {
            return Err(CheckError::assertion(format!("unexpected group {}", row)));
        };
        let (_, members) = unclaimed.swap_remove(position);
        matched.push((row, members.clone()));
    }
    Ok(matched)
}

pub(super) fn average_by_make(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let cars = &ctx.contexts.cars;
        let all = all_rows(cars).await?;
        let aggregates = vec![Aggregate::avg("Mileage")];
        let output = cars
            .select()
            .group_by(["Make"], aggregates.clone())
            .fetch()
            .await?;
        ctx.trace_payload("mileage by make", &output);

        let expected = buckets(&all, &["Make"]);
        for (row, members) in match_buckets(&output, &expected, &["Make"], &aggregates)? {
            let miles = numbers(&members, "Mileage");
            let avg = miles.iter().sum::<f64>() / miles.len() as f64;
            ensure_number(row, "$avg_Mileage", avg)?;
        }
        Ok(Some(format!("{} makes", output.len())))
    }
    .boxed()
}

pub(super) fn aggregates_by_make_and_year(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let cars = &ctx.contexts.cars;
        let all = all_rows(cars).await?;
        let keys = ["Make", "Year"];
        let aggregates = vec![
            Aggregate::sum("Mileage"),
            Aggregate::count("Id"),
            Aggregate::min("Mileage"),
            Aggregate::max("Mileage"),
        ];
        let output = cars
            .select()
            .group_by(keys, aggregates.clone())
            .sort_by("Make")
            .fetch()
            .await?;

        let expected = buckets(&all, &keys);
        for (row, members) in match_buckets(&output, &expected, &keys, &aggregates)? {
            let miles = numbers(&members, "Mileage");
            ensure_number(row, "$sum_Mileage", miles.iter().sum())?;
            ensure_number(row, "$count_Id", members.len() as f64)?;
            ensure_number(row, "$min_Mileage", miles.iter().copied().fold(f64::INFINITY, f64::min))?;
            ensure_number(row, "$max_Mileage", miles.iter().copied().fold(f64::NEG_INFINITY, f64::max))?;
        }
        Ok(Some(format!("{} groups", output.len())))
    }
    .boxed()
}
