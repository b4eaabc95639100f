use futures::FutureExt;
use futures::future::BoxFuture;
use qcert_core::{Value, counter, record, token};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use super::ensure_inserted;
use crate::{CheckResult, SuiteContext, ensure_check};

const TOKEN_LEN: usize = 32;

pub(super) fn owner_counter(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let owners = &ctx.contexts.owners;
        let (generator, next) = counter(1);
        owners.context().register_default("Id", generator)?;

        let input = ctx.fixtures(|f| {
            (0..ctx.fixture_count)
                .map(|_| f.owner(true, None))
                .collect::<Vec<_>>()
        });
        let output = owners.insert(input.clone()).await?;
        ensure_inserted(owners, &input, &output)?;

        let ids: Vec<i64> = output
            .iter()
            .map(|r| r.get("Id").and_then(Value::as_i64).unwrap_or(i64::MIN))
            .collect();
        ensure_check!(
            ids.windows(2).all(|w| w[0] < w[1]) && ids.first() == Some(&1),
            "injected ids are not 1, 2, ...: {:?}",
            ids
        );
        let invoked = next.load(Ordering::SeqCst) - 1;
        ensure_check!(
            invoked == input.len() as i64,
            "generator ran {} times for {} records",
            invoked,
            input.len()
        );
        ctx.remember_inserted(owners.name(), &output);
        Ok(Some(format!("ids {:?}", ids)))
    }
    .boxed()
}

pub(super) fn dealer_token(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let dealers = &ctx.contexts.dealers;
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let mut inner = token(TOKEN_LEN);
        dealers.register_default("Id", move || {
            counted.fetch_add(1, Ordering::SeqCst);
            inner()
        })?;

        let input = ctx.fixtures(|f| (0..3).map(|_| f.dealer(true, None)).collect::<Vec<_>>());
        let output = dealers.insert(input.clone()).await?;
        ensure_inserted(dealers, &input, &output)?;

        let mut seen = HashSet::new();
        for dealer in &output {
            let id = dealer.get("Id").and_then(Value::as_str).unwrap_or_default();
            ensure_check!(
                id.chars().count() == TOKEN_LEN && id.chars().all(|c| c.is_ascii_alphanumeric()),
                "dealer id '{}' is not a {}-character token",
                id,
                TOKEN_LEN
            );
            ensure_check!(seen.insert(id.to_string()), "dealer id '{}' repeated", id);
        }
        let invoked = calls.load(Ordering::SeqCst);
        ensure_check!(
            invoked == input.len(),
            "generator ran {} times for {} records",
            invoked,
            input.len()
        );
        ctx.remember_inserted(dealers.name(), &output);
        Ok(None)
    }
    .boxed()
}

pub(super) fn explicit_value_kept(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let owners = &ctx.contexts.owners;
        let start = 500_000;
        let next = Arc::new(AtomicI64::new(start));
        let handle = next.clone();
        owners.register_default("Id", move || Value::Int(next.fetch_add(1, Ordering::SeqCst)))?;

        let input = ctx.fixtures(|f| {
            vec![
                f.owner(false, Some(record! { "Id" => 100_000 })),
                f.owner(false, None),
            ]
        });
        let output = owners.insert(input.clone()).await?;
        ensure_inserted(owners, &input, &output)?;

        let ids: Vec<Option<i64>> = output
            .iter()
            .map(|r| r.get("Id").and_then(Value::as_i64))
            .collect();
        ensure_check!(
            ids == vec![Some(100_000), Some(start)],
            "expected ids [100000, {}], got {:?}",
            start,
            ids
        );
        ensure_check!(
            handle.load(Ordering::SeqCst) == start + 1,
            "generator ran for a record that supplied its own value"
        );
        ctx.remember_inserted(owners.name(), &output);
        Ok(None)
    }
    .boxed()
}
