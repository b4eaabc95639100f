//! qcert Core - shared abstractions for the query-adapter conformance harness
//!
//! This crate defines the vocabulary both sides of a certification run speak:
//!
//! - `Value` / `Record` - scalar values and field-name keyed rows
//! - `Schema` / `FieldDescriptor` - runtime column descriptions
//! - `Predicate` - explicit boolean filter tree (comparisons joined by AND/OR)
//! - `SelectQuery`, `GroupBy`, `Mutation` - the rest of the fluent query contract
//! - `QueryContext` - the table-scoped trait an adapter implements
//! - `Provisioner` / `Adapter` - lifecycle collaborators used to build contexts
//! - `Table` - the fluent builder layer checks are written against

mod context;
mod defaults;
mod error;
mod predicate;
mod provision;
mod query;
mod schema;
mod types;

pub use context::*;
pub use defaults::*;
pub use error::*;
pub use predicate::*;
pub use provision::*;
pub use query::*;
pub use schema::*;
pub use types::*;
