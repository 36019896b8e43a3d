//! Flat, per-category tables over a finished task map.
//!
//! Every (task, event) attachment becomes one row, so a transfer fanned out
//! to three tasks shows up three times, once under each task. Timestamps are
//! written as epoch seconds and the remaining columns use the input file
//! names, so a table can be fed back through ingestion (the extra `task`
//! column is ignored there).

use std::collections::BTreeMap;
use std::io;

use chrono::{DateTime, Utc};

use crate::event::{Event, Transition, WorkerTransfer};
use crate::state::EventCategory;
use crate::task::Task;
use crate::time::epoch_seconds;

const TRANSITION_COLUMNS: &[&str] = &[
    "task",
    "time",
    "begins",
    "ends",
    "start",
    "finish",
    "called_from",
    "stimulus_id",
    "key",
];

const TRANSFER_COLUMNS: &[&str] = &[
    "task",
    "start",
    "stop",
    "middle",
    "duration",
    "keys",
    "total",
    "bandwidth",
    "compressed",
    "who",
    "called_from",
    "type",
    "time",
];

/// Column names for a category's table.
pub const fn columns(category: EventCategory) -> &'static [&'static str] {
    match category {
        EventCategory::SchedulerTransition | EventCategory::WorkerTransition => {
            TRANSITION_COLUMNS
        }
        EventCategory::WorkerTransfer => TRANSFER_COLUMNS,
    }
}

/// Rows of one event category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    category: EventCategory,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn new(category: EventCategory) -> Self {
        Self {
            category,
            rows: Vec::new(),
        }
    }

    pub const fn category(&self) -> EventCategory {
        self.category
    }

    pub const fn columns(&self) -> &'static [&'static str] {
        columns(self.category)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the header and every row as CSV.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.columns())?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// One table per event category. Categories with no events have empty tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularView {
    tables: BTreeMap<EventCategory, Table>,
}

impl TabularView {
    pub(crate) fn from_tasks(tasks: &[Task]) -> Self {
        let mut tables: BTreeMap<EventCategory, Table> = EventCategory::INGEST_ORDER
            .into_iter()
            .map(|category| (category, Table::new(category)))
            .collect();

        for task in tasks {
            for event in task.events() {
                let row = match event {
                    Event::SchedulerTransition(t) | Event::WorkerTransition(t) => {
                        transition_row(task.name(), t)
                    }
                    Event::WorkerTransfer(x) => transfer_row(task.name(), x),
                };
                tables
                    .entry(event.category())
                    .or_insert_with(|| Table::new(event.category()))
                    .rows
                    .push(row);
            }
        }

        Self { tables }
    }

    pub fn get(&self, category: EventCategory) -> Option<&Table> {
        self.tables.get(&category)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Total rows across all tables.
    pub fn row_count(&self) -> usize {
        self.tables.values().map(Table::len).sum()
    }
}

fn epoch(ts: DateTime<Utc>) -> String {
    epoch_seconds(ts).to_string()
}

fn opt_epoch(ts: Option<DateTime<Utc>>) -> String {
    ts.map(epoch).unwrap_or_default()
}

fn transition_row(task: &str, t: &Transition) -> Vec<String> {
    vec![
        task.to_string(),
        epoch(t.time),
        opt_epoch(t.begins),
        opt_epoch(t.ends),
        t.start.to_string(),
        t.finish.to_string(),
        t.source.called_from.clone(),
        t.source.stimulus_id.clone(),
        t.key.clone(),
    ]
}

fn transfer_row(task: &str, x: &WorkerTransfer) -> Vec<String> {
    vec![
        task.to_string(),
        opt_epoch(x.start),
        opt_epoch(x.stop),
        opt_epoch(x.middle),
        x.duration.to_string(),
        x.keys.to_string(),
        x.total.to_string(),
        x.bandwidth.to_string(),
        x.compressed.to_string(),
        x.who.clone(),
        x.called_from.clone(),
        x.direction.to_string(),
        epoch(x.time),
    ]
}
