//! Per-field default-value injection
//!
//! A context may carry callbacks that fill fields the caller left out of an
//! insert. Callbacks are stateful (`FnMut`) so they can count or remember
//! what they already handed out.

use indexmap::IndexMap;
use rand::{Rng, distributions::Alphanumeric};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::{Record, Value};

/// Callback producing the value for one omitted field of one inserted record
pub type DefaultGenerator = Box<dyn FnMut() -> Value + Send>;

/// Registered default generators for one table, keyed by field
#[derive(Default)]
pub struct DefaultValues {
    generators: IndexMap<String, DefaultGenerator>,
}

impl DefaultValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the generator for `field`
    pub fn register(&mut self, field: impl Into<String>, generator: DefaultGenerator) {
        self.generators.insert(field.into(), generator);
    }

    pub fn contains(&self, field: &str) -> bool {
        self.generators.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Fill every registered field absent from `record`, calling each
    /// generator at most once. Fields present (even as NULL) are left alone.
    /// Returns the number of fields injected.
    pub fn apply(&mut self, record: &mut Record) -> usize {
        let mut injected = 0;
        for (field, generator) in self.generators.iter_mut() {
            if !record.contains(field) {
                record.insert(field.clone(), generator());
                injected += 1;
            }
        }
        injected
    }
}

impl std::fmt::Debug for DefaultValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultValues")
            .field("fields", &self.generators.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Generator yielding `start`, `start + 1`, ... and sharing its position
/// through the returned handle.
pub fn counter(start: i64) -> (DefaultGenerator, Arc<AtomicI64>) {
    let next = Arc::new(AtomicI64::new(start));
    let handle = next.clone();
    let generator: DefaultGenerator =
        Box::new(move || Value::Int(next.fetch_add(1, Ordering::SeqCst)));
    (generator, handle)
}

/// Generator yielding random alphanumeric tokens of exactly `len` characters
pub fn token(len: usize) -> DefaultGenerator {
    Box::new(move || {
        Value::String(
            rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect(),
        )
    })
}
