//! Lifecycle collaborators: provisioning scratch storage and opening contexts

use async_trait::async_trait;
use std::sync::Arc;

use crate::{QcertResult, QueryContext, Schema};

/// Creates and destroys the scratch database and tables a certification
/// run works in, and opens connections to it.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Connection handle passed to [`Adapter::open_context`]
    type Connection: Send + Sync;

    async fn create_database(&self, database: &str) -> QcertResult<()>;

    async fn drop_database(&self, database: &str) -> QcertResult<()>;

    async fn create_table(&self, database: &str, table: &str, schema: &Schema) -> QcertResult<()>;

    async fn drop_table(&self, database: &str, table: &str) -> QcertResult<()>;

    async fn create_connection(&self, database: &str) -> QcertResult<Self::Connection>;
}

/// The adapter under test: turns a connection into table-scoped contexts
pub trait Adapter<C>: Send + Sync {
    /// Short identifier used in logs and reports
    fn name(&self) -> &str;

    fn open_context(&self, connection: &C, table: &str) -> QcertResult<Arc<dyn QueryContext>>;
}
