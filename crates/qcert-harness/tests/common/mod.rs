//! Common test utilities and misbehaving adapters

#![allow(dead_code)]

use async_trait::async_trait;
use qcert_core::{
    Adapter, CompareOp, DataType, DefaultGenerator, FieldDescriptor, Mutation, Predicate,
    Provisioner, QcertError, QcertResult, QueryContext, Record, Schema, SelectQuery,
    SortDirection, Value,
};
use qcert_harness::HarnessConfig;
use qcert_memory::{MemoryAdapter, MemoryConnection, MemoryEngine, MemoryProvisioner};
use std::sync::Arc;

pub fn init_logging() {
    qcert_harness::logging::init_for_tests();
}

/// Config that may touch storage, with a fixed seed and a named database
pub fn acknowledged_config(database: &str) -> HarnessConfig {
    HarnessConfig {
        database: database.to_string(),
        risks_acknowledged: true,
        seed: Some(20240607),
        ..HarnessConfig::default()
    }
}

pub fn memory_provisioner() -> MemoryProvisioner {
    MemoryProvisioner::new(MemoryEngine::new())
}

/// A single way for [`FaultyAdapter`] to misbehave
#[derive(Debug, Clone)]
pub enum Fault {
    /// Strip `field` from rows returned by inserts into `table`
    DropInsertedField { table: String, field: String },
    /// Report one more row than a predicate update touched
    MiscountScopedUpdates,
    /// Fail every select on `table`
    FailSelect { table: String },
    /// Panic inside any delete by key
    PanicOnDelete,
    /// Report `field` of `table` as a 64-bit float column
    WrongColumnType { table: String, field: String },
    /// Evaluate `between` without its bounds
    ExclusiveBetween,
    /// Return selected rows in storage order
    IgnoreSort,
    /// Treat every sort key as ascending
    DescendingAsAscending,
    /// Skip one row more than asked
    SkipOffByOne,
    /// Add a column to every grouped row
    ExtraGroupColumn,
    /// Report every average one higher than it is
    SkewedAverage,
    /// Accept default generators without ever running them
    IgnoreDefaults,
    /// Sort nulls after every other value
    NullsLast,
}

/// `between` rewritten as a strict range, recursively
fn exclusive(predicate: &Predicate) -> Predicate {
    match predicate {
        Predicate::Compare {
            field,
            op: CompareOp::Between(lo, hi),
        } => Predicate::And(
            Box::new(Predicate::Compare {
                field: field.clone(),
                op: CompareOp::Gt(lo.clone()),
            }),
            Box::new(Predicate::Compare {
                field: field.clone(),
                op: CompareOp::Lt(hi.clone()),
            }),
        ),
        Predicate::Compare { .. } => predicate.clone(),
        Predicate::And(l, r) => Predicate::And(Box::new(exclusive(l)), Box::new(exclusive(r))),
        Predicate::Or(l, r) => Predicate::Or(Box::new(exclusive(l)), Box::new(exclusive(r))),
        Predicate::Not(inner) => Predicate::Not(Box::new(exclusive(inner))),
    }
}

/// Memory adapter with one injected fault
pub struct FaultyAdapter {
    inner: MemoryAdapter,
    fault: Fault,
}

impl FaultyAdapter {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: MemoryAdapter::new(),
            fault,
        }
    }
}

impl Adapter<MemoryConnection> for FaultyAdapter {
    fn name(&self) -> &str {
        "faulty-memory"
    }

    fn open_context(
        &self,
        connection: &MemoryConnection,
        table: &str,
    ) -> QcertResult<Arc<dyn QueryContext>> {
        let inner = self.inner.open_context(connection, table)?;
        let schema = match &self.fault {
            Fault::WrongColumnType { table: t, field } if t == table => {
                let mut descriptors: Vec<FieldDescriptor> = inner.schema().iter().cloned().collect();
                for d in descriptors.iter_mut().filter(|d| &d.field == field) {
                    d.datatype = DataType::Float;
                }
                descriptors.into_iter().fold(Schema::new(), Schema::with)
            }
            _ => inner.schema().clone(),
        };
        Ok(Arc::new(FaultyContext {
            inner,
            schema,
            fault: self.fault.clone(),
        }))
    }
}

struct FaultyContext {
    inner: Arc<dyn QueryContext>,
    schema: Schema,
    fault: Fault,
}

#[async_trait]
impl QueryContext for FaultyContext {
    fn table(&self) -> &str {
        self.inner.table()
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    async fn insert(&self, records: Vec<Record>) -> QcertResult<Vec<Record>> {
        let mut stored = self.inner.insert(records).await?;
        if let Fault::DropInsertedField { table, field } = &self.fault {
            if table == self.table() {
                for record in stored.iter_mut() {
                    record.remove(field);
                }
            }
        }
        Ok(stored)
    }

    async fn update(&self, records: Vec<Record>) -> QcertResult<u64> {
        self.inner.update(records).await
    }

    async fn update_where(&self, predicate: &Predicate, mutation: &Mutation) -> QcertResult<u64> {
        let affected = self.inner.update_where(predicate, mutation).await?;
        match self.fault {
            Fault::MiscountScopedUpdates => Ok(affected + 1),
            _ => Ok(affected),
        }
    }

    async fn select(&self, query: &SelectQuery) -> QcertResult<Vec<Record>> {
        if let Fault::FailSelect { table } = &self.fault {
            if table == self.table() {
                return Err(QcertError::Storage(format!("select on {} is broken", table)));
            }
        }
        let mut query = query.clone();
        match self.fault {
            Fault::ExclusiveBetween => query.filter = query.filter.as_ref().map(exclusive),
            Fault::IgnoreSort => query.sort.clear(),
            Fault::DescendingAsAscending => {
                for key in query.sort.iter_mut() {
                    key.direction = SortDirection::Asc;
                }
            }
            Fault::SkipOffByOne => query.skip = query.skip.map(|n| n + 1),
            Fault::NullsLast if query.group.is_none() && !query.sort.is_empty() => {
                return self.select_nulls_last(query).await;
            }
            _ => {}
        }

        let mut rows = self.inner.select(&query).await?;
        if query.group.is_some() {
            for row in rows.iter_mut() {
                match self.fault {
                    Fault::ExtraGroupColumn => {
                        row.insert("$extra", 0);
                    }
                    Fault::SkewedAverage => {
                        let averages: Vec<String> = row
                            .fields()
                            .filter(|f| f.starts_with("$avg_"))
                            .map(str::to_string)
                            .collect();
                        for field in averages {
                            if let Some(avg) = row.get(&field).and_then(Value::as_f64) {
                                row.insert(field, avg + 1.0);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(rows)
    }

    async fn delete(&self, records: Vec<Record>) -> QcertResult<u64> {
        if matches!(self.fault, Fault::PanicOnDelete) {
            panic!("delete exploded");
        }
        self.inner.delete(records).await
    }

    async fn delete_where(&self, predicate: &Predicate) -> QcertResult<u64> {
        self.inner.delete_where(predicate).await
    }

    fn register_default(&self, field: &str, generator: DefaultGenerator) -> QcertResult<()> {
        if matches!(self.fault, Fault::IgnoreDefaults) {
            return Ok(());
        }
        self.inner.register_default(field, generator)
    }
}

impl FaultyContext {
    /// Sort without pagination, move rows whose first key is null to the
    /// end, then paginate.
    async fn select_nulls_last(&self, mut query: SelectQuery) -> QcertResult<Vec<Record>> {
        let (skip, take) = (query.skip.take(), query.take.take());
        let first = query.sort[0].field.clone();
        let rows = self.inner.select(&query).await?;
        let (nulls, values): (Vec<Record>, Vec<Record>) = rows
            .into_iter()
            .partition(|r| r.get(&first).is_none_or(Value::is_null));
        Ok(values
            .into_iter()
            .chain(nulls)
            .skip(skip.unwrap_or(0))
            .take(take.unwrap_or(usize::MAX))
            .collect())
    }
}

/// Memory provisioner that refuses to create one table, or reports a
/// failure after half-creating the database
#[derive(Clone)]
pub struct FlakyProvisioner {
    pub inner: MemoryProvisioner,
    pub fail_table: String,
    pub fail_database: bool,
}

#[async_trait]
impl Provisioner for FlakyProvisioner {
    type Connection = MemoryConnection;

    async fn create_database(&self, database: &str) -> QcertResult<()> {
        self.inner.create_database(database).await?;
        if self.fail_database {
            return Err(QcertError::Storage(format!("lost connection creating {}", database)));
        }
        Ok(())
    }

    async fn drop_database(&self, database: &str) -> QcertResult<()> {
        self.inner.drop_database(database).await
    }

    async fn create_table(&self, database: &str, table: &str, schema: &Schema) -> QcertResult<()> {
        if table == self.fail_table {
            return Err(QcertError::Storage(format!("cannot create {}", table)));
        }
        self.inner.create_table(database, table, schema).await
    }

    async fn drop_table(&self, database: &str, table: &str) -> QcertResult<()> {
        self.inner.drop_table(database, table).await
    }

    async fn create_connection(&self, database: &str) -> QcertResult<MemoryConnection> {
        self.inner.create_connection(database).await
    }
}
