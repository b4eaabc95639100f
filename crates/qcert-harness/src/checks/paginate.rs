use futures::FutureExt;
use futures::future::BoxFuture;
use qcert_core::{Record, SortKey};

use super::{all_rows, ensure_equal_record};
use crate::{CheckError, CheckResult, SuiteContext, ensure_check};

async fn page(ctx: &SuiteContext, skip: Option<usize>, take: Option<usize>) -> Result<Vec<Record>, CheckError> {
    let mut select = ctx.contexts.cars.select().sort(SortKey::asc("Id"));
    if let Some(n) = skip {
        select = select.skip(n);
    }
    if let Some(m) = take {
        select = select.take(m);
    }
    Ok(select.fetch().await?)
}

async fn sorted_by_id(ctx: &SuiteContext) -> Result<Vec<Record>, CheckError> {
    let mut all = all_rows(&ctx.contexts.cars).await?;
    all.sort_by(|a, b| SortKey::asc("Id").compare(a, b));
    Ok(all)
}

/// `skip(n).take(m)` over `total` rows yields `max(0, min(m, total - n))`
fn expected_len(total: usize, skip: usize, take: usize) -> usize {
    take.min(total.saturating_sub(skip))
}

fn ensure_page(all: &[Record], page: &[Record], skip: usize, take: usize) -> Result<(), CheckError> {
    let want = expected_len(all.len(), skip, take);
    ensure_check!(
        page.len() == want,
        "skip({}).take({}) over {} rows returned {}, expected {}",
        skip,
        take,
        all.len(),
        page.len(),
        want
    );
    for (expected, actual) in all.iter().skip(skip).zip(page) {
        ensure_equal_record(expected, actual)?;
    }
    Ok(())
}

pub(super) fn take(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let all = sorted_by_id(ctx).await?;
        for m in [0, 1, 3, all.len() + 2] {
            ensure_page(&all, &page(ctx, None, Some(m)).await?, 0, m)?;
        }
        Ok(None)
    }
    .boxed()
}

pub(super) fn skip_and_take(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let all = sorted_by_id(ctx).await?;
        ensure_check!(all.len() >= 2, "need at least 2 rows, have {}", all.len());

        let first = page(ctx, None, Some(1)).await?;
        let second = page(ctx, Some(1), Some(1)).await?;
        ensure_check!(
            first.len() == 1 && second.len() == 1 && first[0].get("Id") != second[0].get("Id"),
            "skip(1).take(1) returned the same row as take(1)"
        );

        let half = all.len() / 2;
        for (n, m) in [(1, 2), (half, half + 1), (all.len() - 1, 5)] {
            ensure_page(&all, &page(ctx, Some(n), Some(m)).await?, n, m)?;
        }
        let rest = page(ctx, Some(half), None).await?;
        ensure_page(&all, &rest, half, usize::MAX)?;
        Ok(None)
    }
    .boxed()
}

pub(super) fn past_end(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let total = all_rows(&ctx.contexts.cars).await?.len();
        for (n, m) in [(total, None), (total + 5, Some(2))] {
            let rows = page(ctx, Some(n), m).await?;
            ensure_check!(rows.is_empty(), "skip({}) over {} rows returned {}", n, total, rows.len());
        }
        Ok(None)
    }
    .boxed()
}
