use futures::FutureExt;
use futures::future::BoxFuture;
use qcert_core::{Record, record};

use super::{all_rows, ensure_equal_record, ensure_inserted};
use crate::{CheckResult, SuiteContext, ensure_check};

/// Insert `input` into the car table, verify and remember the stored rows
async fn insert_cars(ctx: &SuiteContext, input: Vec<Record>) -> Result<Vec<Record>, crate::CheckError> {
    let cars = &ctx.contexts.cars;
    ctx.trace_payload("inserting cars", &input);
    let output = cars.insert(input.clone()).await?;
    ensure_inserted(cars, &input, &output)?;
    ctx.remember_inserted(cars.name(), &output);
    Ok(output)
}

pub(super) fn single_car(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let cars = &ctx.contexts.cars;
        let focus = record! {
            "Make" => "Ford",
            "Model" => "Focus",
            "Year" => 2008,
            "Mileage" => 74999,
        };
        let stored = cars.insert_one(focus.clone()).await?;
        ensure_inserted(cars, &[focus], std::slice::from_ref(&stored))?;
        ctx.remember_inserted(cars.name(), std::slice::from_ref(&stored));

        let rows = all_rows(cars).await?;
        ensure_check!(rows.len() == 1, "expected 1 row after insert, found {}", rows.len());
        ensure_equal_record(&stored, &rows[0])?;
        Ok(Some(format!("stored as {}", stored)))
    }
    .boxed()
}

pub(super) fn single_car_in_array(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let input = vec![ctx.fixtures(|f| f.car(true, None))];
        insert_cars(ctx, input).await?;
        Ok(None)
    }
    .boxed()
}

pub(super) fn required_only(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let input = ctx.fixtures(|f| f.cars(5, false));
        let output = insert_cars(ctx, input).await?;
        Ok(Some(format!("{} cars", output.len())))
    }
    .boxed()
}

pub(super) fn mixed_optional(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let input = ctx.fixtures(|f| {
            let city = f.decimal(10.0, 40.0);
            let highway = f.decimal(15.0, 50.0);
            vec![
                f.car(false, Some(record! { "MPGCity" => city })),
                f.car(false, Some(record! { "MPGHwy" => highway, "Make" => "Toyota" })),
                f.car(false, Some(record! { "Make" => "Dodge" })),
                f.car(true, None),
            ]
        });
        let output = insert_cars(ctx, input).await?;
        ensure_check!(
            !output[2].get("MPGCity").is_some_and(|v| !v.is_null()),
            "an omitted nullable field came back populated: {}",
            output[2]
        );
        Ok(None)
    }
    .boxed()
}

pub(super) fn random_batch(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let input = ctx.fixtures(|f| f.cars(ctx.fixture_count, true));
        let output = insert_cars(ctx, input).await?;
        Ok(Some(format!("{} cars", output.len())))
    }
    .boxed()
}
