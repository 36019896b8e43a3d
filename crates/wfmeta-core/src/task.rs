//! Per-task timeline assembled from trace events.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{Event, fmt_opt_time};
use crate::state::EventCategory;
use crate::time::merge_lower_bound;

/// All events seen for one task key, plus the bounds derived from them.
///
/// Events are kept in ingestion order, which is not necessarily
/// chronological. `t_start` and `t_end` are running minima over every
/// begin and end observation; they never move later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    name: String,
    events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    t_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    t_end: Option<DateTime<Utc>>,
    /// Reserved for worker attribution; no parser fills it yet.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    workers: BTreeSet<String>,
}

impl Task {
    /// Creates a task with no events.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Vec::new(),
            t_start: None,
            t_end: None,
            workers: BTreeSet::new(),
        }
    }

    /// Creates a task seeded with its first event.
    pub fn with_event(name: impl Into<String>, event: Event) -> Self {
        let mut task = Self::new(name);
        task.add_event(event);
        task
    }

    /// Appends an event and folds its interval into the task bounds.
    ///
    /// Transfers already attached to this task are skipped, since the same
    /// transfer can reach a task more than once. Returns whether the event
    /// was appended.
    pub fn add_event(&mut self, event: Event) -> bool {
        if matches!(event, Event::WorkerTransfer(_)) && self.events.contains(&event) {
            tracing::trace!(task = %self.name, "skipping duplicate transfer");
            return false;
        }

        self.t_start = merge_lower_bound(self.t_start, event.begins());
        self.t_end = merge_lower_bound(self.t_end, event.ends());
        self.events.push(event);
        true
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events of a single category, in ingestion order.
    pub fn events_of(&self, category: EventCategory) -> impl Iterator<Item = &Event> {
        self.events
            .iter()
            .filter(move |event| event.category() == category)
    }

    /// Earliest begin time seen for this task.
    pub const fn t_start(&self) -> Option<DateTime<Utc>> {
        self.t_start
    }

    /// Earliest end time seen for this task.
    pub const fn t_end(&self) -> Option<DateTime<Utc>> {
        self.t_end
    }

    pub const fn workers(&self) -> &BTreeSet<String> {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Task object for task {}:", self.name)?;
        writeln!(f, "\tEvent objects:")?;
        for event in &self.events {
            for line in event.to_string().lines() {
                writeln!(f, "\t\t{line}")?;
            }
        }
        if !self.workers.is_empty() {
            let workers: Vec<&str> = self.workers.iter().map(String::as_str).collect();
            writeln!(f, "\tWorkers: {}", workers.join(", "))?;
        }
        writeln!(
            f,
            "Start time: {}\tEnd time: {}",
            fmt_opt_time(self.t_start),
            fmt_opt_time(self.t_end)
        )
    }
}
