//! In-memory reference adapter for qcert
//!
//! Implements the full query contract over process-local tables so the
//! harness can be exercised end to end without an external database. Rows live
//! as long as the [`MemoryEngine`] they were written to.

mod context;
#[cfg(test)]
mod context_tests;
mod engine;
mod provisioner;

pub use context::{MemoryAdapter, MemoryContext};
pub use engine::MemoryEngine;
pub use provisioner::{MemoryConnection, MemoryProvisioner};
