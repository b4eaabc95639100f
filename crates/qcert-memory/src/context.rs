//! Memory adapter and its table-scoped contexts

use async_trait::async_trait;
use parking_lot::Mutex;
use qcert_core::{
    Adapter, DefaultGenerator, DefaultValues, Mutation, Predicate, QcertError, QcertResult,
    QueryContext, Record, Schema, SelectQuery,
};
use std::sync::Arc;

use crate::{MemoryConnection, MemoryEngine};

/// Adapter opening [`MemoryContext`]s over a [`MemoryConnection`]
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryAdapter;

impl MemoryAdapter {
    pub fn new() -> Self {
        tracing::debug!("memory adapter initialized");
        Self
    }
}

impl Adapter<MemoryConnection> for MemoryAdapter {
    fn name(&self) -> &str {
        "memory"
    }

    fn open_context(
        &self,
        connection: &MemoryConnection,
        table: &str,
    ) -> QcertResult<Arc<dyn QueryContext>> {
        let context = MemoryContext::open(connection.engine(), connection.database(), table)?;
        Ok(Arc::new(context))
    }
}

/// Context bound to one in-memory table.
///
/// The schema is captured when the context is opened; registered default
/// generators live on the context, not the table.
pub struct MemoryContext {
    engine: MemoryEngine,
    database: String,
    table: String,
    schema: Schema,
    defaults: Mutex<DefaultValues>,
}

impl MemoryContext {
    pub fn open(engine: &MemoryEngine, database: &str, table: &str) -> QcertResult<Self> {
        let schema = engine.schema(database, table)?;
        tracing::debug!(database = %database, table = %table, fields = schema.len(), "opened memory context");
        Ok(Self {
            engine: engine.clone(),
            database: database.to_string(),
            table: table.to_string(),
            schema,
            defaults: Mutex::new(DefaultValues::new()),
        })
    }
}

#[async_trait]
impl QueryContext for MemoryContext {
    fn table(&self) -> &str {
        &self.table
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    #[tracing::instrument(skip(self, records), fields(table = %self.table, count = records.len()))]
    async fn insert(&self, mut records: Vec<Record>) -> QcertResult<Vec<Record>> {
        {
            let mut defaults = self.defaults.lock();
            if !defaults.is_empty() {
                for record in records.iter_mut() {
                    defaults.apply(record);
                }
            }
        }
        let stored = self
            .engine
            .write_table(&self.database, &self.table, |t| t.insert(records))?;
        tracing::debug!(inserted = stored.len(), "insert completed");
        Ok(stored)
    }

    #[tracing::instrument(skip(self, records), fields(table = %self.table, count = records.len()))]
    async fn update(&self, records: Vec<Record>) -> QcertResult<u64> {
        self.engine
            .write_table(&self.database, &self.table, |t| t.update(records))
    }

    #[tracing::instrument(skip_all, fields(table = %self.table))]
    async fn update_where(&self, predicate: &Predicate, mutation: &Mutation) -> QcertResult<u64> {
        if mutation.is_empty() {
            return Err(QcertError::Other("update with no assignments".into()));
        }
        let affected = self
            .engine
            .write_table(&self.database, &self.table, |t| t.update_where(predicate, mutation))?;
        tracing::debug!(affected, "scoped update completed");
        Ok(affected)
    }

    #[tracing::instrument(skip_all, fields(table = %self.table))]
    async fn select(&self, query: &SelectQuery) -> QcertResult<Vec<Record>> {
        self.engine
            .read_table(&self.database, &self.table, |t| t.select(query))
    }

    #[tracing::instrument(skip(self, records), fields(table = %self.table, count = records.len()))]
    async fn delete(&self, records: Vec<Record>) -> QcertResult<u64> {
        self.engine
            .write_table(&self.database, &self.table, |t| t.delete(records))
    }

    #[tracing::instrument(skip_all, fields(table = %self.table))]
    async fn delete_where(&self, predicate: &Predicate) -> QcertResult<u64> {
        self.engine
            .write_table(&self.database, &self.table, |t| t.delete_where(predicate))
    }

    fn register_default(&self, field: &str, generator: DefaultGenerator) -> QcertResult<()> {
        if !self.schema.contains(field) {
            return Err(QcertError::UnknownField {
                table: self.table.clone(),
                field: field.to_string(),
            });
        }
        tracing::debug!(table = %self.table, field = %field, "registered default generator");
        self.defaults.lock().register(field, generator);
        Ok(())
    }
}
