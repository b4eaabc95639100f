use futures::FutureExt;
use futures::future::BoxFuture;

use super::{all_rows, ensure_same_rows};
use crate::{CheckResult, SuiteContext, ensure_check};

pub(super) fn empty_table(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let rows = all_rows(&ctx.contexts.cars).await?;
        ensure_check!(rows.is_empty(), "found {} rows", rows.len());
        Ok(None)
    }
    .boxed()
}

pub(super) fn select_all(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let cars = &ctx.contexts.cars;
        let expected = ctx.inserted(cars.name());
        let actual = all_rows(cars).await?;
        ctx.trace_payload("all cars", &actual);
        ensure_same_rows(&expected, &actual)?;
        Ok(Some(format!("{} rows", actual.len())))
    }
    .boxed()
}
