//! Process-local storage backing the memory adapter

use parking_lot::RwLock;
use qcert_core::{
    DefaultValue, Mutation, Predicate, QcertError, QcertResult, Record, Schema, SelectQuery, Value,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Shared handle to every database held in memory.
///
/// Cloning the engine clones the handle, not the data.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    databases: Arc<RwLock<HashMap<String, MemoryDatabase>>>,
}

#[derive(Default)]
struct MemoryDatabase {
    tables: HashMap<String, MemoryTable>,
}

pub(crate) struct MemoryTable {
    name: String,
    schema: Schema,
    rows: Vec<Record>,
    next_identity: i64,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_database(&self, database: &str) -> bool {
        self.databases.read().contains_key(database)
    }

    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.databases.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn table_names(&self, database: &str) -> QcertResult<Vec<String>> {
        let databases = self.databases.read();
        let db = databases
            .get(database)
            .ok_or_else(|| QcertError::DatabaseNotFound(database.to_string()))?;
        let mut names: Vec<String> = db.tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub(crate) fn create_database(&self, database: &str) -> QcertResult<()> {
        let mut databases = self.databases.write();
        if databases.contains_key(database) {
            return Err(QcertError::AlreadyExists(format!("database '{}'", database)));
        }
        databases.insert(database.to_string(), MemoryDatabase::default());
        Ok(())
    }

    pub(crate) fn drop_database(&self, database: &str) -> QcertResult<()> {
        self.databases
            .write()
            .remove(database)
            .map(|_| ())
            .ok_or_else(|| QcertError::DatabaseNotFound(database.to_string()))
    }

    pub(crate) fn create_table(&self, database: &str, table: &str, schema: &Schema) -> QcertResult<()> {
        let mut databases = self.databases.write();
        let db = databases
            .get_mut(database)
            .ok_or_else(|| QcertError::DatabaseNotFound(database.to_string()))?;
        if db.tables.contains_key(table) {
            return Err(QcertError::AlreadyExists(format!("table '{}'", table)));
        }
        db.tables.insert(
            table.to_string(),
            MemoryTable {
                name: table.to_string(),
                schema: schema.clone(),
                rows: Vec::new(),
                next_identity: 1,
            },
        );
        Ok(())
    }

    pub(crate) fn drop_table(&self, database: &str, table: &str) -> QcertResult<()> {
        let mut databases = self.databases.write();
        let db = databases
            .get_mut(database)
            .ok_or_else(|| QcertError::DatabaseNotFound(database.to_string()))?;
        db.tables
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| QcertError::TableNotFound(table.to_string()))
    }

    pub(crate) fn schema(&self, database: &str, table: &str) -> QcertResult<Schema> {
        self.read_table(database, table, |t| Ok(t.schema.clone()))
    }

    pub(crate) fn read_table<T>(
        &self,
        database: &str,
        table: &str,
        f: impl FnOnce(&MemoryTable) -> QcertResult<T>,
    ) -> QcertResult<T> {
        let databases = self.databases.read();
        let t = databases
            .get(database)
            .ok_or_else(|| QcertError::DatabaseNotFound(database.to_string()))?
            .tables
            .get(table)
            .ok_or_else(|| QcertError::TableNotFound(table.to_string()))?;
        f(t)
    }

    pub(crate) fn write_table<T>(
        &self,
        database: &str,
        table: &str,
        f: impl FnOnce(&mut MemoryTable) -> QcertResult<T>,
    ) -> QcertResult<T> {
        let mut databases = self.databases.write();
        let t = databases
            .get_mut(database)
            .ok_or_else(|| QcertError::DatabaseNotFound(database.to_string()))?
            .tables
            .get_mut(table)
            .ok_or_else(|| QcertError::TableNotFound(table.to_string()))?;
        f(t)
    }
}

impl MemoryTable {
    /// Insert a batch atomically: either every record is stored or none is.
    pub(crate) fn insert(&mut self, records: Vec<Record>) -> QcertResult<Vec<Record>> {
        let mut next_identity = self.next_identity;
        let mut prepared = Vec::with_capacity(records.len());

        for record in records {
            self.check_fields(record.fields())?;
            let mut stored = Record::new();
            for descriptor in self.schema.iter() {
                let name = descriptor.field.as_str();
                let value = match record.get(name) {
                    Some(value) => value.clone(),
                    None if descriptor.is_identity
                        || descriptor.default == Some(DefaultValue::AutoIncrement) =>
                    {
                        next_identity += 1;
                        Value::Int(next_identity - 1)
                    }
                    None => match descriptor.default.as_ref().and_then(DefaultValue::produce) {
                        Some(value) => value,
                        None if descriptor.is_required() => {
                            return Err(QcertError::MissingRequired {
                                table: self.name.clone(),
                                field: name.to_string(),
                            });
                        }
                        None => continue,
                    },
                };
                self.check_value(name, &value)?;
                if let Some(n) = value.as_i64().filter(|_| descriptor.is_identity) {
                    next_identity = next_identity.max(n + 1);
                }
                stored.insert(name, value);
            }
            prepared.push(stored);
        }

        let mut candidate = self.rows.clone();
        candidate.extend(prepared.iter().cloned());
        self.check_unique(&candidate)?;

        self.rows = candidate;
        self.next_identity = next_identity;
        Ok(prepared)
    }

    /// Whole-record update keyed by primary key
    pub(crate) fn update(&mut self, records: Vec<Record>) -> QcertResult<u64> {
        let mut candidate = self.rows.clone();
        let mut affected = 0;
        for record in records {
            self.check_fields(record.fields())?;
            for (field, value) in record.iter() {
                self.check_value(field, value)?;
            }
            let key = self.key_of(&record)?;
            if let Some(row) = candidate.iter_mut().find(|row| self.key_matches(row, &key)) {
                row.merge(&record);
                affected += 1;
            }
        }
        self.check_unique(&candidate)?;
        self.rows = candidate;
        Ok(affected)
    }

    pub(crate) fn update_where(&mut self, predicate: &Predicate, mutation: &Mutation) -> QcertResult<u64> {
        self.check_fields(predicate.fields().into_iter())?;
        self.check_fields(mutation.assignments().iter().map(|(f, _)| f.as_str()))?;
        for (field, value) in mutation.assignments() {
            self.check_value(field, value)?;
        }

        let mut candidate = self.rows.clone();
        let mut affected = 0;
        for row in candidate.iter_mut().filter(|row| predicate.matches(row)) {
            mutation.apply_to(row);
            affected += 1;
        }
        self.check_unique(&candidate)?;
        self.rows = candidate;
        Ok(affected)
    }

    pub(crate) fn select(&self, query: &SelectQuery) -> QcertResult<Vec<Record>> {
        if let Some(filter) = &query.filter {
            self.check_fields(filter.fields().into_iter())?;
        }
        let mut output_fields: Vec<String> = Vec::new();
        if let Some(group) = &query.group {
            self.check_fields(group.keys.iter().map(String::as_str))?;
            self.check_fields(group.aggregates.iter().map(|a| a.field.as_str()))?;
            output_fields = group.output_fields();
        }
        for key in &query.sort {
            let known = if query.group.is_some() {
                output_fields.contains(&key.field)
            } else {
                self.schema.contains(&key.field)
            };
            if !known {
                return Err(self.unknown_field(&key.field));
            }
        }
        Ok(query.apply(self.rows.iter().cloned()))
    }

    pub(crate) fn delete(&mut self, records: Vec<Record>) -> QcertResult<u64> {
        let mut removed = 0;
        for record in records {
            let key = self.key_of(&record)?;
            let before = self.rows.len();
            let rows = std::mem::take(&mut self.rows);
            self.rows = rows
                .into_iter()
                .filter(|row| !self.key_matches(row, &key))
                .collect();
            removed += (before - self.rows.len()) as u64;
        }
        Ok(removed)
    }

    pub(crate) fn delete_where(&mut self, predicate: &Predicate) -> QcertResult<u64> {
        self.check_fields(predicate.fields().into_iter())?;
        let before = self.rows.len();
        self.rows.retain(|row| !predicate.matches(row));
        Ok((before - self.rows.len()) as u64)
    }

    fn unknown_field(&self, field: &str) -> QcertError {
        QcertError::UnknownField {
            table: self.name.clone(),
            field: field.to_string(),
        }
    }

    fn check_fields<'a>(&self, mut fields: impl Iterator<Item = &'a str>) -> QcertResult<()> {
        match fields.find(|f| !self.schema.contains(f)) {
            Some(unknown) => Err(self.unknown_field(unknown)),
            None => Ok(()),
        }
    }

    fn check_value(&self, field: &str, value: &Value) -> QcertResult<()> {
        let Some(descriptor) = self.schema.get(field) else {
            return Err(self.unknown_field(field));
        };
        if value.is_null() && !descriptor.is_nullable {
            return Err(QcertError::MissingRequired {
                table: self.name.clone(),
                field: field.to_string(),
            });
        }
        if !descriptor.datatype.accepts(value) {
            return Err(QcertError::TypeMismatch {
                table: self.name.clone(),
                field: field.to_string(),
                expected: descriptor.datatype.to_string(),
                actual: value.type_name().to_string(),
            });
        }
        Ok(())
    }

    /// Primary key tuple of `record`; every key field must be present
    fn key_of(&self, record: &Record) -> QcertResult<Vec<(String, Value)>> {
        let primary = self.schema.primary_key();
        if primary.is_empty() {
            return Err(QcertError::NotSupported(format!(
                "table '{}' has no primary key",
                self.name
            )));
        }
        primary
            .into_iter()
            .map(|descriptor| {
                record
                    .get(&descriptor.field)
                    .map(|v| (descriptor.field.clone(), v.clone()))
                    .ok_or_else(|| QcertError::MissingRequired {
                        table: self.name.clone(),
                        field: descriptor.field.clone(),
                    })
            })
            .collect()
    }

    fn key_matches(&self, row: &Record, key: &[(String, Value)]) -> bool {
        key.iter()
            .all(|(field, value)| row.get(field).is_some_and(|v| v.loosely_equals(value)))
    }

    /// Enforce primary-key and unique-column constraints over `rows`
    fn check_unique(&self, rows: &[Record]) -> QcertResult<()> {
        let primary: Vec<&str> = self
            .schema
            .primary_key()
            .into_iter()
            .map(|d| d.field.as_str())
            .collect();
        let mut constraints: Vec<Vec<&str>> = Vec::new();
        if !primary.is_empty() {
            constraints.push(primary);
        }
        for descriptor in self.schema.iter().filter(|d| d.is_unique) {
            constraints.push(vec![descriptor.field.as_str()]);
        }

        for fields in constraints {
            let mut seen = HashSet::new();
            for row in rows {
                let values: Vec<&Value> = fields.iter().filter_map(|f| row.get(f)).collect();
                if values.iter().any(|v| v.is_null()) {
                    continue;
                }
                let key = values
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                if !seen.insert(key.clone()) {
                    return Err(QcertError::DuplicateKey {
                        table: self.name.clone(),
                        field: fields.join(","),
                        value: key,
                    });
                }
            }
        }
        Ok(())
    }
}
