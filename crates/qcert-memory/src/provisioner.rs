//! Provisioning of in-memory scratch databases

use async_trait::async_trait;
use parking_lot::Mutex;
use qcert_core::{Provisioner, QcertError, QcertResult, Schema};
use std::sync::Arc;

use crate::MemoryEngine;

/// Provisioner over a [`MemoryEngine`].
///
/// Every lifecycle call is appended to an operation log, which tests use to
/// check what a run did to its scratch storage.
#[derive(Clone, Default)]
pub struct MemoryProvisioner {
    engine: MemoryEngine,
    operations: Arc<Mutex<Vec<String>>>,
}

impl MemoryProvisioner {
    pub fn new(engine: MemoryEngine) -> Self {
        Self {
            engine,
            operations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn engine(&self) -> &MemoryEngine {
        &self.engine
    }

    /// Lifecycle operations performed so far, e.g. `create_table Car`
    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().clone()
    }

    fn log(&self, operation: String) {
        self.operations.lock().push(operation);
    }
}

/// Connection to one in-memory database
#[derive(Clone)]
pub struct MemoryConnection {
    engine: MemoryEngine,
    database: String,
}

impl MemoryConnection {
    pub fn engine(&self) -> &MemoryEngine {
        &self.engine
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

#[async_trait]
impl Provisioner for MemoryProvisioner {
    type Connection = MemoryConnection;

    #[tracing::instrument(skip(self))]
    async fn create_database(&self, database: &str) -> QcertResult<()> {
        self.log(format!("create_database {}", database));
        self.engine.create_database(database)?;
        tracing::info!(database = %database, "memory database created");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn drop_database(&self, database: &str) -> QcertResult<()> {
        self.log(format!("drop_database {}", database));
        self.engine.drop_database(database)?;
        tracing::info!(database = %database, "memory database dropped");
        Ok(())
    }

    #[tracing::instrument(skip(self, schema))]
    async fn create_table(&self, database: &str, table: &str, schema: &Schema) -> QcertResult<()> {
        self.log(format!("create_table {}", table));
        self.engine.create_table(database, table, schema)
    }

    #[tracing::instrument(skip(self))]
    async fn drop_table(&self, database: &str, table: &str) -> QcertResult<()> {
        self.log(format!("drop_table {}", table));
        self.engine.drop_table(database, table)
    }

    #[tracing::instrument(skip(self))]
    async fn create_connection(&self, database: &str) -> QcertResult<MemoryConnection> {
        if !self.engine.has_database(database) {
            return Err(QcertError::DatabaseNotFound(database.to_string()));
        }
        self.log(format!("create_connection {}", database));
        Ok(MemoryConnection {
            engine: self.engine.clone(),
            database: database.to_string(),
        })
    }
}
