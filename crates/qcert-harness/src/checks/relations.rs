use futures::FutureExt;
use futures::future::BoxFuture;
use qcert_core::{Record, Table, Value};

use super::{all_rows, ensure_inserted, primary_id};
use crate::fixtures::cross_ref;
use crate::{CheckError, CheckResult, SuiteContext, ensure_check};

/// Link the first cars to the first rows of `other` and verify every link
/// row in `links` points at rows that exist.
async fn link(
    ctx: &SuiteContext,
    links: &Table,
    other: &Table,
    other_key: &str,
) -> CheckResult {
    let cars = all_rows(&ctx.contexts.cars).await?;
    let targets = all_rows(other).await?;
    ensure_check!(
        cars.len() >= 2 && !targets.is_empty(),
        "need 2 cars and 1 {} row, have {} and {}",
        other.name(),
        cars.len(),
        targets.len()
    );

    let mut input = Vec::new();
    for (car, target) in cars.iter().zip(&targets).take(3) {
        input.push(cross_ref("CarId", primary_id(car)?, other_key, primary_id(target)?));
    }
    // one car with two partners, one partner with two cars
    if targets.len() >= 2 {
        input.push(cross_ref("CarId", primary_id(&cars[0])?, other_key, primary_id(&targets[1])?));
    }
    input.push(cross_ref("CarId", primary_id(&cars[1])?, other_key, primary_id(&targets[0])?));
    input.dedup();

    let output = links.insert(input.clone()).await?;
    ensure_inserted(links, &input, &output)?;
    ctx.remember_inserted(links.name(), &output);

    let car_ids: Vec<Value> = cars.iter().map(primary_id).collect::<Result<_, _>>()?;
    let target_ids: Vec<Value> = targets.iter().map(primary_id).collect::<Result<_, _>>()?;
    let stored = all_rows(links).await?;
    ensure_check!(
        stored.len() >= input.len(),
        "{} holds {} rows after inserting {}",
        links.name(),
        stored.len(),
        input.len()
    );
    for row in &stored {
        ensure_reference(row, "CarId", &car_ids)?;
        ensure_reference(row, other_key, &target_ids)?;
    }
    Ok(Some(format!("{} links", output.len())))
}

fn ensure_reference(row: &Record, field: &str, ids: &[Value]) -> Result<(), CheckError> {
    let value = row.get(field);
    ensure_check!(
        value.is_some_and(|v| ids.iter().any(|id| id.loosely_equals(v))),
        "link {} references a missing row through {}",
        row,
        field
    );
    Ok(())
}

pub(super) fn car_owners(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let c = &ctx.contexts;
        link(ctx, &c.car_owners, &c.owners, "OwnerId").await
    }
    .boxed()
}

pub(super) fn car_dealers(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let c = &ctx.contexts;
        link(ctx, &c.car_dealers, &c.dealers, "DealerId").await
    }
    .boxed()
}
