use futures::FutureExt;
use futures::future::BoxFuture;
use qcert_core::{Record, SortKey, Value};

use super::{all_rows, ensure_same_rows, ensure_sorted};
use crate::{CheckResult, SuiteContext, ensure_check};

async fn ensure_sort(ctx: &SuiteContext, keys: Vec<SortKey>) -> CheckResult {
    let cars = &ctx.contexts.cars;
    let all = all_rows(cars).await?;
    let select = keys.iter().cloned().fold(cars.select(), |s, k| s.sort(k));
    let sorted = select.fetch().await?;
    ensure_same_rows(&all, &sorted)?;
    ensure_sorted(&sorted, &keys)?;
    Ok(Some(format!("{} rows in order", sorted.len())))
}

pub(super) fn ascending(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move { ensure_sort(ctx, vec![SortKey::asc("Mileage")]).await }.boxed()
}

pub(super) fn descending(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move { ensure_sort(ctx, vec![SortKey::desc("Year")]).await }.boxed()
}

pub(super) fn multiple_keys(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        ensure_sort(
            ctx,
            vec![SortKey::asc("Make"), SortKey::desc("Year"), SortKey::asc("Id")],
        )
        .await
    }
    .boxed()
}

/// Nulls may sort first or last, but must form one block at an end, and
/// the remaining rows must be ascending.
pub(super) fn null_placement(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let cars = &ctx.contexts.cars;
        let all = all_rows(cars).await?;
        let sorted = cars.select().sort_by("MPGCity").fetch().await?;
        ensure_same_rows(&all, &sorted)?;

        let is_null = |r: &Record| r.get("MPGCity").is_none_or(Value::is_null);
        let nulls = sorted.iter().filter(|&r| is_null(r)).count();
        let leading = sorted.iter().take_while(|&r| is_null(r)).count();
        let trailing = sorted.iter().rev().take_while(|&r| is_null(r)).count();
        ensure_check!(
            leading == nulls || trailing == nulls,
            "{} null MPGCity values are split: {} at the start, {} at the end",
            nulls,
            leading,
            trailing
        );

        let values: Vec<Record> = sorted.into_iter().filter(|r| !is_null(r)).collect();
        ensure_sorted(&values, &[SortKey::asc("MPGCity")])?;
        let placement = if nulls == 0 {
            "no nulls"
        } else if leading == nulls {
            "nulls first"
        } else {
            "nulls last"
        };
        Ok(Some(format!("{} rows, {}", values.len() + nulls, placement)))
    }
    .boxed()
}
