//! Certification entry point and scratch database lifecycle

use futures::FutureExt;
use qcert_core::{Adapter, Provisioner, QcertError, Schema};
use std::future::Future;
use std::panic::{AssertUnwindSafe, resume_unwind};

use crate::checks::battery;
use crate::{
    ContextSet, HarnessConfig, HarnessError, HarnessResult, Reporter, RunReport, SuiteContext,
    SuiteRunner, TracingReporter,
};

/// Everything a run would create or drop, in the order it would do so
pub fn destructive_operations(config: &HarnessConfig) -> Vec<String> {
    let names = config.tables.names();
    let mut operations = Vec::with_capacity(2 + names.len() * 2);
    operations.push(format!("create database '{}'", config.database));
    operations.extend(names.iter().map(|t| format!("create table '{}'", t)));
    operations.extend(names.iter().map(|t| format!("drop table '{}'", t)));
    operations.push(format!("drop database '{}'", config.database));
    operations
}

/// Run the full battery against `adapter`, logging through [`TracingReporter`]
pub async fn certify_adapter<A, P>(
    adapter: &A,
    provisioner: &P,
    config: &HarnessConfig,
) -> HarnessResult<RunReport>
where
    P: Provisioner,
    A: Adapter<P::Connection> + ?Sized,
{
    certify_adapter_with(adapter, provisioner, config, &mut TracingReporter).await
}

/// Run the full battery against `adapter` inside a scratch database.
///
/// Refuses to touch storage unless `config.risks_acknowledged` is set. A
/// failed or errored check is reported in the returned [`RunReport`]; use
/// [`RunReport::into_result`] to turn it into an error.
pub async fn certify_adapter_with<A, P>(
    adapter: &A,
    provisioner: &P,
    config: &HarnessConfig,
    reporter: &mut dyn Reporter,
) -> HarnessResult<RunReport>
where
    P: Provisioner,
    A: Adapter<P::Connection> + ?Sized,
{
    if !config.risks_acknowledged {
        let operations = destructive_operations(config);
        tracing::warn!(
            adapter = %adapter.name(),
            database = %config.database,
            "this run creates and drops a database and tables; set risks_acknowledged to proceed"
        );
        for operation in &operations {
            tracing::warn!("  will {}", operation);
        }
        return Err(HarnessError::RisksNotAcknowledged { operations });
    }
    config.validate()?;

    tracing::info!(adapter = %adapter.name(), database = %config.database, "certifying adapter");
    let tables = config.tables.schemas();
    ScratchDatabase::scoped(provisioner, &config.database, &tables, |connection| async move {
        let contexts = ContextSet::open(adapter, &connection, &config.tables)
            .map_err(|e| HarnessError::provisioning("open contexts", e))?;
        let suite = SuiteContext::new(contexts, config);
        let runner = SuiteRunner::new(battery());
        Ok(runner.run(&suite, reporter).await)
    })
    .await
}

/// A database and tables created for one run, dropped by [`Self::teardown`]
pub struct ScratchDatabase<'p, P: Provisioner> {
    provisioner: &'p P,
    database: String,
    tables: Vec<String>,
}

impl<'p, P: Provisioner> ScratchDatabase<'p, P> {
    /// Create the database and tables and open a connection.
    ///
    /// On failure whatever was already created is dropped again. A failed
    /// `create_database` is still followed by a `drop_database`, since the
    /// provisioner may have left a partial database behind.
    pub async fn create(
        provisioner: &'p P,
        database: &str,
        tables: &[(String, Schema)],
    ) -> HarnessResult<(Self, P::Connection)> {
        if let Err(e) = provisioner.create_database(database).await {
            if let Err(drop_error) = provisioner.drop_database(database).await {
                tracing::debug!(database = %database, error = %drop_error, "nothing to drop after failed create");
            }
            return Err(HarnessError::provisioning("create database", e));
        }
        let mut scratch = Self {
            provisioner,
            database: database.to_string(),
            tables: Vec::with_capacity(tables.len()),
        };

        for (name, schema) in tables {
            if let Err(e) = provisioner.create_table(database, name, schema).await {
                scratch.teardown().await.ok();
                return Err(HarnessError::provisioning(format!("create table {}", name), e));
            }
            scratch.tables.push(name.clone());
        }

        match provisioner.create_connection(database).await {
            Ok(connection) => Ok((scratch, connection)),
            Err(e) => {
                scratch.teardown().await.ok();
                Err(HarnessError::provisioning("create connection", e))
            }
        }
    }

    /// Run `body` against a fresh scratch database, tearing it down exactly
    /// once afterwards, whether `body` succeeds, fails or panics.
    ///
    /// A teardown error is returned only when `body` itself succeeded.
    pub async fn scoped<T, F, Fut>(
        provisioner: &'p P,
        database: &str,
        tables: &[(String, Schema)],
        body: F,
    ) -> HarnessResult<T>
    where
        F: FnOnce(P::Connection) -> Fut,
        Fut: Future<Output = HarnessResult<T>>,
    {
        let (scratch, connection) = Self::create(provisioner, database, tables).await?;
        let outcome = AssertUnwindSafe(body(connection)).catch_unwind().await;
        let teardown = scratch.teardown().await;

        match outcome {
            Err(panic) => resume_unwind(panic),
            Ok(Ok(value)) => teardown
                .map(|_| value)
                .map_err(|e| HarnessError::provisioning("teardown", e)),
            Ok(Err(e)) => Err(e),
        }
    }

    /// Drop every created table, then the database. Keeps going after a
    /// failed drop and returns the first error.
    pub async fn teardown(self) -> Result<(), QcertError> {
        let mut first_error = None;
        for table in &self.tables {
            if let Err(e) = self.provisioner.drop_table(&self.database, table).await {
                tracing::warn!(table = %table, error = %e, "failed to drop scratch table");
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.provisioner.drop_database(&self.database).await {
            tracing::warn!(database = %self.database, error = %e, "failed to drop scratch database");
            first_error.get_or_insert(e);
        }
        tracing::debug!(database = %self.database, tables = self.tables.len(), "scratch database torn down");
        first_error.map_or(Ok(()), Err)
    }
}
