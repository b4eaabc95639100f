//! Harness configuration
//!
//! Layered as: built-in defaults, then a TOML file, then `QCERT_*`
//! environment variables. Command-line flags are applied on top by the
//! binary.

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use crate::{HarnessError, HarnessResult, TableNames};

pub const ENV_RISKS_ACKNOWLEDGED: &str = "QCERT_RISKS_ACKNOWLEDGED";
pub const ENV_VERBOSE: &str = "QCERT_VERBOSE";
pub const ENV_SEED: &str = "QCERT_SEED";
pub const ENV_DATABASE: &str = "QCERT_DATABASE";

const MIN_FIXTURES: usize = 2;
const MAX_FIXTURES: usize = 10_000;

/// Options that change what a run reports but never what it checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Echo record payloads in log messages
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Scratch database created for the run and dropped afterwards
    pub database: String,
    /// Must be set before any database or table is created or dropped
    pub risks_acknowledged: bool,
    pub verbose: bool,
    /// Size of the randomized insert batch
    pub fixture_count: usize,
    /// Seed for the fixture generator; entropy when absent
    pub seed: Option<u64>,
    pub tables: TableNames,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            database: scratch_database_name(),
            risks_acknowledged: false,
            verbose: false,
            fixture_count: 10,
            seed: None,
            tables: TableNames::default(),
        }
    }
}

/// A fresh database name that will not collide with a previous run
pub fn scratch_database_name() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("qcert_{}", &id[..12])
}

impl HarnessConfig {
    pub fn from_toml_str(source: &str) -> HarnessResult<Self> {
        let config: HarnessConfig =
            toml::from_str(source).map_err(|e| HarnessError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("reading {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), database = %config.database, "loaded harness config");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> HarnessResult<String> {
        toml::to_string_pretty(self).map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// Apply overrides read through `lookup`, keyed by the `QCERT_*` names
    pub fn apply_overrides<F>(&mut self, lookup: F) -> HarnessResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_RISKS_ACKNOWLEDGED) {
            self.risks_acknowledged = parse_flag(ENV_RISKS_ACKNOWLEDGED, &raw)?;
        }
        if let Some(raw) = lookup(ENV_VERBOSE) {
            self.verbose = parse_flag(ENV_VERBOSE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SEED) {
            let seed = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| HarnessError::Config(format!("{}: {}", ENV_SEED, e)))?;
            self.seed = Some(seed);
        }
        if let Some(raw) = lookup(ENV_DATABASE) {
            self.database = raw.trim().to_string();
        }
        self.validate()
    }

    pub fn apply_env(&mut self) -> HarnessResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    pub fn validate(&self) -> HarnessResult<()> {
        if self.database.trim().is_empty() {
            return Err(HarnessError::Config("database name is empty".into()));
        }
        if !(MIN_FIXTURES..=MAX_FIXTURES).contains(&self.fixture_count) {
            return Err(HarnessError::Config(format!(
                "fixture_count must be between {} and {}, got {}",
                MIN_FIXTURES, MAX_FIXTURES, self.fixture_count
            )));
        }
        let names = self.tables.names();
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(HarnessError::Config("table name is empty".into()));
            }
            if names[..i].contains(name) {
                return Err(HarnessError::Config(format!("table name '{}' is used twice", name)));
            }
        }
        Ok(())
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            verbose: self.verbose,
        }
    }
}

fn parse_flag(key: &str, raw: &str) -> HarnessResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(HarnessError::Config(format!(
            "{}: expected a boolean, got '{}'",
            key, other
        ))),
    }
}
