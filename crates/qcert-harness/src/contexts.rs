//! The live state a battery runs against

use indexmap::IndexMap;
use parking_lot::Mutex;
use qcert_core::{Adapter, QcertResult, Record, Table};

use crate::{FixtureGenerator, HarnessConfig, RunOptions, TableNames};

/// One context per reference table
#[derive(Debug, Clone)]
pub struct ContextSet {
    pub cars: Table,
    pub owners: Table,
    pub dealers: Table,
    pub car_owners: Table,
    pub car_dealers: Table,
}

impl ContextSet {
    pub fn open<C, A>(adapter: &A, connection: &C, tables: &TableNames) -> QcertResult<Self>
    where
        A: Adapter<C> + ?Sized,
    {
        let open = |name: &str| -> QcertResult<Table> {
            let context = adapter.open_context(connection, name)?;
            tracing::debug!(adapter = %adapter.name(), table = %name, "opened context");
            Ok(Table::new(context))
        };
        Ok(Self {
            cars: open(&tables.car)?,
            owners: open(&tables.owner)?,
            dealers: open(&tables.dealer)?,
            car_owners: open(&tables.car_owner)?,
            car_dealers: open(&tables.car_dealer)?,
        })
    }

    pub fn all(&self) -> [&Table; 5] {
        [
            &self.cars,
            &self.owners,
            &self.dealers,
            &self.car_owners,
            &self.car_dealers,
        ]
    }
}

/// Mutable state shared by the checks of one run
struct RunState {
    fixtures: FixtureGenerator,
    /// Rows returned by successful inserts, per table
    inserted: IndexMap<String, Vec<Record>>,
}

/// Everything a check procedure receives
pub struct SuiteContext {
    pub contexts: ContextSet,
    pub options: RunOptions,
    pub tables: TableNames,
    /// Size of the randomized batches
    pub fixture_count: usize,
    state: Mutex<RunState>,
}

impl SuiteContext {
    pub fn new(contexts: ContextSet, config: &HarnessConfig) -> Self {
        let fixtures = match config.seed {
            Some(seed) => FixtureGenerator::seeded(seed),
            None => FixtureGenerator::from_entropy(),
        };
        Self {
            contexts,
            options: config.run_options(),
            tables: config.tables.clone(),
            fixture_count: config.fixture_count,
            state: Mutex::new(RunState {
                fixtures,
                inserted: IndexMap::new(),
            }),
        }
    }

    /// Borrow the fixture generator for the duration of `f`.
    ///
    /// Never hold on to generated state across an adapter call.
    pub fn fixtures<T>(&self, f: impl FnOnce(&mut FixtureGenerator) -> T) -> T {
        f(&mut self.state.lock().fixtures)
    }

    pub fn remember_inserted(&self, table: &str, rows: &[Record]) {
        self.state
            .lock()
            .inserted
            .entry(table.to_string())
            .or_default()
            .extend(rows.iter().cloned());
    }

    pub fn inserted(&self, table: &str) -> Vec<Record> {
        self.state
            .lock()
            .inserted
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Log record payloads when the run is verbose
    pub fn trace_payload(&self, label: &str, rows: &[Record]) {
        if !self.options.verbose {
            return;
        }
        match serde_json::to_string(rows) {
            Ok(json) => tracing::info!(label = %label, rows = rows.len(), "{}", json),
            Err(e) => tracing::warn!(label = %label, error = %e, "payload not serializable"),
        }
    }
}
