use futures::FutureExt;
use futures::future::BoxFuture;
use qcert_core::{Mutation, Value, field};

use super::{all_rows, ensure_equal_record, primary_id};
use crate::{CheckResult, SuiteContext, ensure_check};

const HIGHWAY_MPG: f64 = 42.5;

pub(super) fn whole_record(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let cars = &ctx.contexts.cars;
        let rows = all_rows(cars).await?;
        ensure_check!(!rows.is_empty(), "no cars to update");

        let mut changed = rows[0].clone();
        let id = primary_id(&changed)?;
        let mileage = changed.get("Mileage").and_then(Value::as_i64).unwrap_or(0);
        let modified = ctx.fixtures(|f| {
            let (lo, hi) = (
                chrono::NaiveDate::from_ymd_opt(2020, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
                chrono::NaiveDate::from_ymd_opt(2024, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)),
            );
            lo.zip(hi).map(|(lo, hi)| f.date_between(lo, hi))
        });
        changed.insert("Mileage", mileage + 1000);
        changed.insert("MPGCity", 33.3);
        changed.insert("DateModified", modified);

        let affected = cars.update_one(changed.clone()).await?;
        ensure_check!(affected == 1, "update reported {} rows for an existing key", affected);

        let fetched = cars.select().filter(field("Id").eq(id.clone())).fetch().await?;
        ensure_check!(fetched.len() == 1, "car {} matched {} rows after update", id, fetched.len());
        ensure_equal_record(&changed, &fetched[0])?;
        Ok(Some(format!("car {} updated", id)))
    }
    .boxed()
}

pub(super) fn missing_key(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let cars = &ctx.contexts.cars;
        let rows = all_rows(cars).await?;
        let max_id = rows
            .iter()
            .filter_map(|r| r.get("Id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0);

        let mut ghost = ctx.fixtures(|f| f.car(false, None));
        ghost.insert("Id", max_id + 1000);
        let affected = cars.update_one(ghost).await?;
        ensure_check!(affected == 0, "update of a missing key reported {} rows", affected);

        let after = all_rows(cars).await?;
        ensure_check!(
            after.len() == rows.len(),
            "row count changed from {} to {}",
            rows.len(),
            after.len()
        );
        Ok(None)
    }
    .boxed()
}

pub(super) fn by_predicate(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let cars = &ctx.contexts.cars;
        let predicate = field("Make").eq("Ford");
        let before = all_rows(cars).await?;
        let expected = before.iter().filter(|r| predicate.matches(r)).count();
        ensure_check!(expected > 0, "no Ford rows to update");

        let affected = cars
            .filter(predicate.clone())
            .update(Mutation::new().set("MPGHwy", HIGHWAY_MPG))
            .await?;
        ensure_check!(
            affected == expected as u64,
            "update reported {} rows, {} match",
            affected,
            expected
        );

        let after = all_rows(cars).await?;
        for row in &after {
            let hwy = row.get("MPGHwy").and_then(Value::as_f64);
            if predicate.matches(row) {
                ensure_check!(hwy == Some(HIGHWAY_MPG), "matched row not updated: {}", row);
            } else {
                let original = before.iter().find(|b| b.get("Id") == row.get("Id"));
                ensure_check!(
                    original.is_some_and(|b| b.get("MPGHwy") == row.get("MPGHwy")),
                    "unmatched row changed: {}",
                    row
                );
            }
        }
        Ok(Some(format!("{} rows updated", affected)))
    }
    .boxed()
}
