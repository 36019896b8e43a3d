//! One record of a trace file, keyed by column name.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::event::EventError;
use crate::time;

/// Raw column values of a single CSV record.
///
/// Values are kept as the text found in the file; typed accessors do the
/// conversion and report the offending column on failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: HashMap<String, String>,
}

impl Row {
    /// Pairs a record with the file's header line.
    ///
    /// Unnamed columns (the index column pandas writes by default) are dropped.
    pub fn from_record(headers: &csv::StringRecord, record: &csv::StringRecord) -> Self {
        headers
            .iter()
            .zip(record.iter())
            .filter(|(name, _)| !name.trim().is_empty())
            .map(|(name, value)| (name.trim(), value))
            .collect()
    }

    /// Returns the raw value of a column, if the column exists.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// Returns the raw value of a column that must exist.
    pub fn require(&self, column: &'static str) -> Result<&str, EventError> {
        self.get(column)
            .ok_or(EventError::MissingColumn { column })
    }

    /// Parses a mandatory numeric column.
    pub fn number(&self, column: &'static str) -> Result<f64, EventError> {
        time::parse_number(self.require(column)?)
            .map_err(|source| EventError::InvalidValue { column, source })?
            .ok_or(EventError::MissingValue { column })
    }

    /// Parses a column that must hold a timestamp.
    pub fn required_timestamp(&self, column: &'static str) -> Result<DateTime<Utc>, EventError> {
        self.timestamp(column)?
            .ok_or(EventError::MissingValue { column })
    }

    /// Parses a timestamp column that must exist but may hold a sentinel.
    pub fn timestamp(&self, column: &'static str) -> Result<Option<DateTime<Utc>>, EventError> {
        time::parse_epoch(self.require(column)?)
            .map_err(|source| EventError::InvalidValue { column, source })
    }

    /// Parses a timestamp column that may be absent from the file altogether.
    pub fn optional_timestamp(
        &self,
        column: &'static str,
    ) -> Result<Option<DateTime<Utc>>, EventError> {
        match self.get(column) {
            Some(raw) => time::parse_epoch(raw)
                .map_err(|source| EventError::InvalidValue { column, source }),
            None => Ok(None),
        }
    }

    /// Sets a column value, replacing any previous one.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
