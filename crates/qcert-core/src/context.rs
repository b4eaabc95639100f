//! Query context trait and the fluent table layer

use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    Aggregate, DefaultGenerator, GroupBy, Mutation, Predicate, QcertError, QcertResult, Record,
    Schema, SelectQuery, SortKey, Value,
};

/// A table-scoped handle implemented by the adapter under test.
///
/// Every operation may suspend on I/O. Implementations must be usable from
/// a shared reference; any internal state (such as registered defaults) needs
/// interior mutability.
#[async_trait]
pub trait QueryContext: Send + Sync {
    /// Name of the table this context is bound to
    fn table(&self) -> &str;

    /// The schema as the adapter reports it
    fn schema(&self) -> &Schema;

    /// Insert records, returning them as stored, including any
    /// adapter-generated fields, in input order.
    async fn insert(&self, records: Vec<Record>) -> QcertResult<Vec<Record>>;

    /// Whole-record update keyed by primary key; every present field is
    /// written. Returns the number of rows affected.
    async fn update(&self, records: Vec<Record>) -> QcertResult<u64>;

    /// Apply `mutation` to every row matching `predicate`, returning the
    /// number of matched rows.
    async fn update_where(&self, predicate: &Predicate, mutation: &Mutation) -> QcertResult<u64>;

    /// Run a select
    async fn select(&self, query: &SelectQuery) -> QcertResult<Vec<Record>>;

    /// Hard delete by primary key. Returns the number of rows removed.
    async fn delete(&self, records: Vec<Record>) -> QcertResult<u64>;

    /// Hard delete of every row matching `predicate`
    async fn delete_where(&self, predicate: &Predicate) -> QcertResult<u64>;

    /// Register a callback invoked once per inserted record that omits
    /// `field`, before the record is persisted.
    fn register_default(&self, field: &str, generator: DefaultGenerator) -> QcertResult<()>;
}

/// Fluent wrapper over a [`QueryContext`]
#[derive(Clone)]
pub struct Table {
    inner: Arc<dyn QueryContext>,
}

impl Table {
    pub fn new(inner: Arc<dyn QueryContext>) -> Self {
        Self { inner }
    }

    pub fn name(&self) -> &str {
        self.inner.table()
    }

    pub fn schema(&self) -> &Schema {
        self.inner.schema()
    }

    pub fn context(&self) -> &Arc<dyn QueryContext> {
        &self.inner
    }

    /// Insert a single record and return it as stored
    pub async fn insert_one(&self, record: Record) -> QcertResult<Record> {
        self.inner
            .insert(vec![record])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                QcertError::Other(format!("insert into '{}' returned no rows", self.name()))
            })
    }

    pub async fn insert(&self, records: Vec<Record>) -> QcertResult<Vec<Record>> {
        self.inner.insert(records).await
    }

    pub async fn update_one(&self, record: Record) -> QcertResult<u64> {
        self.inner.update(vec![record]).await
    }

    pub async fn update(&self, records: Vec<Record>) -> QcertResult<u64> {
        self.inner.update(records).await
    }

    pub async fn delete(&self, records: Vec<Record>) -> QcertResult<u64> {
        self.inner.delete(records).await
    }

    /// Register a default-value callback for `field`
    pub fn register_default<F>(&self, field: &str, generator: F) -> QcertResult<()>
    where
        F: FnMut() -> Value + Send + 'static,
    {
        self.inner.register_default(field, Box::new(generator))
    }

    /// Start a select over the whole table
    pub fn select(&self) -> SelectBuilder<'_> {
        SelectBuilder {
            table: self,
            query: SelectQuery::new(),
        }
    }

    /// Scope an update, delete or select to the rows matching `predicate`
    pub fn filter(&self, predicate: Predicate) -> Filtered<'_> {
        Filtered {
            table: self,
            predicate,
        }
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("name", &self.name()).finish()
    }
}

/// Rows of a table selected by a predicate
pub struct Filtered<'a> {
    table: &'a Table,
    predicate: Predicate,
}

impl<'a> Filtered<'a> {
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub async fn update(&self, mutation: Mutation) -> QcertResult<u64> {
        self.table
            .inner
            .update_where(&self.predicate, &mutation)
            .await
    }

    pub async fn delete(&self) -> QcertResult<u64> {
        self.table.inner.delete_where(&self.predicate).await
    }

    pub fn select(self) -> SelectBuilder<'a> {
        self.table.select().filter(self.predicate)
    }
}

/// Builder for a [`SelectQuery`] bound to a table
pub struct SelectBuilder<'a> {
    table: &'a Table,
    query: SelectQuery,
}

impl SelectBuilder<'_> {
    /// Add a filter; a second call ANDs with the first
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.query.filter = Some(match self.query.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    /// Append an ascending sort key
    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.query.sort.push(SortKey::asc(field));
        self
    }

    /// Append a descending sort key
    pub fn sort_by_desc(mut self, field: impl Into<String>) -> Self {
        self.query.sort.push(SortKey::desc(field));
        self
    }

    /// Append an arbitrary sort key
    pub fn sort(mut self, key: SortKey) -> Self {
        self.query.sort.push(key);
        self
    }

    /// Group by `keys`, computing `aggregates` per bucket
    pub fn group_by<I, S>(mut self, keys: I, aggregates: Vec<Aggregate>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut group = GroupBy::new(keys);
        group.aggregates = aggregates;
        self.query.group = Some(group);
        self
    }

    pub fn skip(mut self, n: usize) -> Self {
        self.query.skip = Some(n);
        self
    }

    pub fn take(mut self, n: usize) -> Self {
        self.query.take = Some(n);
        self
    }

    pub fn query(&self) -> &SelectQuery {
        &self.query
    }

    pub fn into_query(self) -> SelectQuery {
        self.query
    }

    pub async fn fetch(self) -> QcertResult<Vec<Record>> {
        self.table.inner.select(&self.query).await
    }

    pub async fn count(self) -> QcertResult<usize> {
        Ok(self.fetch().await?.len())
    }
}
