use futures::FutureExt;
use futures::future::BoxFuture;
use qcert_core::{Predicate, Record, Value, field};

use super::{all_rows, primary_id};
use crate::oracle::values_equal;
use crate::{CheckError, CheckResult, SuiteContext, ensure_check};

fn links_to(links: &[Record], car_id: &Value) -> usize {
    links
        .iter()
        .filter(|l| l.get("CarId").is_some_and(|v| values_equal(car_id, v)))
        .count()
}

pub(super) fn by_key(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let c = &ctx.contexts;
        let links = all_rows(&c.car_owners).await?;
        let linked_id = links
            .first()
            .and_then(|l| l.get("CarId").cloned())
            .ok_or_else(|| CheckError::assertion("no car is linked to an owner"))?;
        let linked_before = links_to(&links, &linked_id);

        let cars = all_rows(&c.cars).await?;
        let car = cars
            .iter()
            .find(|r| primary_id(r).is_ok_and(|id| values_equal(&linked_id, &id)))
            .cloned()
            .ok_or_else(|| CheckError::assertion(format!("linked car {} does not exist", linked_id)))?;

        let removed = c.cars.delete(vec![car.clone()]).await?;
        ensure_check!(removed == 1, "deleting car {} removed {} rows", linked_id, removed);

        let remaining = c.cars.select().filter(field("Id").eq(linked_id.clone())).count().await?;
        ensure_check!(remaining == 0, "car {} still selectable after delete", linked_id);
        let total = all_rows(&c.cars).await?.len();
        ensure_check!(
            total == cars.len() - 1,
            "car count went from {} to {}",
            cars.len(),
            total
        );

        let linked_after = links_to(&all_rows(&c.car_owners).await?, &linked_id);
        ensure_check!(
            linked_after == linked_before,
            "links to car {} went from {} to {}; delete must not cascade",
            linked_id,
            linked_before,
            linked_after
        );

        let again = c.cars.delete(vec![car]).await?;
        ensure_check!(again == 0, "deleting a missing car removed {} rows", again);
        Ok(Some(format!("car {} deleted", linked_id)))
    }
    .boxed()
}

pub(super) fn by_predicate(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let cars = &ctx.contexts.cars;
        let predicate: Predicate = field("Year").lt(2000).or(field("Make").eq("Dodge"));
        let before = all_rows(cars).await?;
        let expected = before.iter().filter(|r| predicate.matches(r)).count();

        let removed = cars.filter(predicate.clone()).delete().await?;
        ensure_check!(
            removed == expected as u64,
            "delete reported {} rows, {} match",
            removed,
            expected
        );

        let after = all_rows(cars).await?;
        ensure_check!(
            after.len() == before.len() - expected,
            "{} rows remain, expected {}",
            after.len(),
            before.len() - expected
        );
        ensure_check!(
            after.iter().all(|r| !predicate.matches(r)),
            "a matching row survived the delete"
        );
        let survivors: Vec<Value> = after.iter().map(primary_id).collect::<Result<_, _>>()?;
        Ok(Some(format!("{} removed, {} remain", removed, survivors.len())))
    }
    .boxed()
}
