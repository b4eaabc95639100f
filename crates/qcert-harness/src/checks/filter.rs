use futures::FutureExt;
use futures::future::BoxFuture;
use qcert_core::{Predicate, Record, Value, field};

use super::{all_rows, ensure_same_rows};
use crate::{CheckError, CheckResult, SuiteContext, ensure_check};

/// Compare the adapter's filtered select with the harness's own evaluation
/// of `predicate` over the full table.
async fn ensure_filter(ctx: &SuiteContext, predicate: Predicate) -> CheckResult {
    let cars = &ctx.contexts.cars;
    let all = all_rows(cars).await?;
    let expected: Vec<Record> = all.iter().filter(|r| predicate.matches(r)).cloned().collect();
    let actual = cars.select().filter(predicate).fetch().await?;
    ctx.trace_payload("filtered cars", &actual);
    ensure_same_rows(&expected, &actual)?;
    Ok(Some(format!("{} of {} rows", actual.len(), all.len())))
}

fn first_value(rows: &[Record], name: &str) -> Result<Value, CheckError> {
    rows.iter()
        .find_map(|r| r.get(name).filter(|v| !v.is_null()).cloned())
        .ok_or_else(|| CheckError::assertion(format!("no car has a value for {}", name)))
}

pub(super) fn equals(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let all = all_rows(&ctx.contexts.cars).await?;
        let fords = all.iter().filter(|r| r.get("Make") == Some(&Value::from("Ford"))).count();
        ensure_check!(fords > 0, "fixture set has no Ford rows");
        ensure_filter(ctx, field("Make").eq("Ford")).await
    }
    .boxed()
}

pub(super) fn less_than(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move { ensure_filter(ctx, field("Year").lt(2010)).await }.boxed()
}

pub(super) fn between(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let all = all_rows(&ctx.contexts.cars).await?;
        // a stored value used as both bounds must still match
        let pivot = first_value(&all, "Mileage")?;
        let exact = field("Mileage").between(pivot.clone(), pivot.clone());
        ensure_check!(
            !cars_matching(ctx, exact.clone()).await?.is_empty(),
            "between({0}, {0}) excluded a row holding {0}",
            pivot
        );
        ensure_filter(ctx, exact).await?;
        ensure_filter(ctx, field("Mileage").between(25_000, 150_000)).await
    }
    .boxed()
}

pub(super) fn membership(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move { ensure_filter(ctx, field("Make").in_(["Ford", "Toyota"])).await }.boxed()
}

pub(super) fn nested(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let predicate = field("Make")
            .eq("Ford")
            .and(field("Year").gte(2000))
            .or(field("Mileage").lt(100_000).not().and(field("Model").is_not_null()))
            .or(field("MPGCity").is_null().and(field("Make").ne("Dodge")));
        ensure_check!(predicate.depth() >= 3, "predicate depth {}", predicate.depth());
        ensure_filter(ctx, predicate).await
    }
    .boxed()
}

async fn cars_matching(ctx: &SuiteContext, predicate: Predicate) -> Result<Vec<Record>, CheckError> {
    Ok(ctx.contexts.cars.select().filter(predicate).fetch().await?)
}
