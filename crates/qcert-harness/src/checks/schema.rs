use futures::FutureExt;
use futures::future::BoxFuture;

use crate::oracle::schema_diff;
use crate::{CheckError, CheckResult, SuiteContext};

pub(super) fn schemas_match(ctx: &SuiteContext) -> BoxFuture<'_, CheckResult> {
    async move {
        let expected = ctx.tables.schemas();
        let mut problems = Vec::new();
        for ((name, schema), table) in expected.iter().zip(ctx.contexts.all()) {
            if table.name() != name {
                problems.push(format!("context for '{}' is bound to '{}'", name, table.name()));
                continue;
            }
            problems.extend(
                schema_diff(schema, table.schema())
                    .into_iter()
                    .map(|m| format!("{}: {}", name, m)),
            );
        }
        if !problems.is_empty() {
            return Err(CheckError::assertion(problems.join("; ")));
        }
        Ok(Some(format!("{} tables match", expected.len())))
    }
    .boxed()
}
