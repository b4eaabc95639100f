//! Conformance harness for query adapters
//!
//! Drives any [`qcert_core::Adapter`] through a fixed, ordered battery of
//! behavioral checks covering inserts, default injection, updates, filters,
//! sorting, grouping, pagination, relational fixtures and deletes, and
//! reports a pass, fail or error outcome per check. The run stops at the
//! first check that does not pass.
//!
//! # Usage
//!
//! ```rust,ignore
//! use qcert_harness::{HarnessConfig, certify_adapter};
//!
//! let mut config = HarnessConfig::default();
//! config.risks_acknowledged = true;
//! let report = certify_adapter(&adapter, &provisioner, &config).await?;
//! report.into_result()?;
//! ```

mod certify;
pub mod checks;
mod config;
mod contexts;
mod error;
pub mod fixtures;
pub mod logging;
pub mod oracle;
mod reporter;
mod runner;
pub mod tables;

pub use certify::{ScratchDatabase, certify_adapter, certify_adapter_with, destructive_operations};
pub use config::{
    ENV_DATABASE, ENV_RISKS_ACKNOWLEDGED, ENV_SEED, ENV_VERBOSE, HarnessConfig, RunOptions,
    scratch_database_name,
};
pub use contexts::{ContextSet, SuiteContext};
pub use error::{CheckError, CheckResult, HarnessError, HarnessResult};
pub use fixtures::{FixtureGenerator, cross_ref};
pub use reporter::{RecordingReporter, Reporter, ReporterEvent, Reporters, TracingReporter};
pub use runner::{Check, CheckFn, CheckOutcome, CheckStatus, RunReport, SuiteRunner};
pub use tables::TableNames;
