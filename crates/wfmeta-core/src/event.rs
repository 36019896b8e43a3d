//! Typed trace events, one per input row.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::{KeysError, TransferKeys, parse_keys};
use crate::row::Row;
use crate::state::{EventCategory, TaskState, TransferDirection, UnknownVariant};
use crate::time::{EventTimes, TimeError};

/// Errors raised while turning a row into an event.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EventError {
    /// A required column is not present in the file.
    #[error("missing column `{column}`")]
    MissingColumn { column: &'static str },

    /// A required column holds a "no value" sentinel.
    #[error("column `{column}` has no value")]
    MissingValue { column: &'static str },

    /// A column holds text that is not a valid number or timestamp.
    #[error("invalid value in column `{column}`: {source}")]
    InvalidValue {
        column: &'static str,
        #[source]
        source: TimeError,
    },

    /// A state column holds something other than a known task state.
    #[error("invalid state in column `{column}`: {source}")]
    InvalidState {
        column: &'static str,
        #[source]
        source: UnknownVariant,
    },

    /// The `type` column of a transfer is neither incoming nor outgoing.
    #[error("invalid transfer direction: {0}")]
    InvalidDirection(#[source] UnknownVariant),

    /// The `keys` column is not a valid mapping literal.
    #[error("invalid keys literal {literal:?}: {source}")]
    InvalidKeys {
        literal: String,
        #[source]
        source: KeysError,
    },

    /// A transition names an empty task key.
    #[error("task key cannot be empty")]
    EmptyKey,
}

/// Where a transition was triggered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSource {
    /// Address of the component that emitted the transition.
    pub called_from: String,
    /// Causal trigger shared by related transitions.
    pub stimulus_id: String,
}

/// A task state transition, as seen by the scheduler or by one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Task the transition applies to.
    pub key: String,
    /// When the transition was observed.
    pub time: DateTime<Utc>,
    /// Start of the work the transition covers, if it has a duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begins: Option<DateTime<Utc>>,
    /// End of the work the transition covers, if it has a duration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends: Option<DateTime<Utc>>,
    /// State before the transition.
    pub start: TaskState,
    /// State after the transition.
    pub finish: TaskState,
    pub source: EventSource,
}

impl Transition {
    /// Parses a scheduler or worker transition row.
    pub fn from_row(row: &Row) -> Result<Self, EventError> {
        let EventTimes { time, begins, ends } = EventTimes::from_row(row)?;

        let start = parse_state(row, "start")?;
        let finish = parse_state(row, "finish")?;

        let source = EventSource {
            called_from: row.require("called_from")?.to_string(),
            stimulus_id: row.require("stimulus_id")?.to_string(),
        };

        let key = row.require("key")?;
        if key.trim().is_empty() {
            return Err(EventError::EmptyKey);
        }

        Ok(Self {
            key: key.to_string(),
            time,
            begins,
            ends,
            start,
            finish,
            source,
        })
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, label: &str) -> fmt::Result {
        writeln!(f, "{label} for task {}", self.key)?;
        writeln!(
            f,
            "\tEvent time: {}\tBegin time: {}\tEnd time: {}",
            fmt_time(self.time),
            fmt_opt_time(self.begins),
            fmt_opt_time(self.ends)
        )?;
        writeln!(f, "\tStart: {}\tFinish: {}", self.start, self.finish)?;
        writeln!(f, "\tSource:")?;
        writeln!(f, "\t\tCalled from: {}", self.source.called_from)?;
        writeln!(f, "\t\tStimulus ID: {}", self.source.stimulus_id)
    }
}

fn parse_state(row: &Row, column: &'static str) -> Result<TaskState, EventError> {
    row.require(column)?
        .parse()
        .map_err(|source| EventError::InvalidState { column, source })
}

/// One data movement between two workers, possibly batching several tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerTransfer {
    /// Tasks moved, with their sizes in bytes.
    pub keys: TransferKeys,
    /// When the transfer was logged.
    pub time: DateTime<Utc>,
    pub start: Option<DateTime<Utc>>,
    pub stop: Option<DateTime<Utc>>,
    /// Midpoint as reported by the worker, not recomputed.
    pub middle: Option<DateTime<Utc>>,
    /// Duration in seconds.
    pub duration: f64,
    /// Total bytes moved.
    pub total: f64,
    /// Bytes per second.
    pub bandwidth: f64,
    /// Compression ratio.
    pub compressed: f64,
    /// Peer worker address.
    pub who: String,
    /// Reporting worker address.
    pub called_from: String,
    pub direction: TransferDirection,
}

impl WorkerTransfer {
    /// Parses a worker transfer row.
    pub fn from_row(row: &Row) -> Result<Self, EventError> {
        let literal = row.require("keys")?;
        let keys = parse_keys(literal).map_err(|source| EventError::InvalidKeys {
            literal: literal.to_string(),
            source,
        })?;

        let direction = row
            .require("type")?
            .parse()
            .map_err(EventError::InvalidDirection)?;

        Ok(Self {
            keys,
            time: row.required_timestamp("time")?,
            start: row.timestamp("start")?,
            stop: row.timestamp("stop")?,
            middle: row.timestamp("middle")?,
            duration: row.number("duration")?,
            total: row.number("total")?,
            bandwidth: row.number("bandwidth")?,
            compressed: row.number("compressed")?,
            who: row.require("who")?.to_string(),
            called_from: row.require("called_from")?.to_string(),
            direction,
        })
    }

    /// Number of tasks this transfer references.
    pub fn n_tasks(&self) -> usize {
        self.keys.len()
    }
}

impl fmt::Display for WorkerTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Worker transfer ({}) of {} task(s)",
            self.direction,
            self.n_tasks()
        )?;
        writeln!(f, "\tKeys: {}", self.keys)?;
        writeln!(
            f,
            "\tEvent time: {}\tStart: {}\tMiddle: {}\tStop: {}",
            fmt_time(self.time),
            fmt_opt_time(self.start),
            fmt_opt_time(self.middle),
            fmt_opt_time(self.stop)
        )?;
        writeln!(
            f,
            "\tDuration: {}s\tTotal: {} bytes\tBandwidth: {} B/s\tCompressed: {}",
            self.duration, self.total, self.bandwidth, self.compressed
        )?;
        writeln!(f, "\tPeer: {}\tCalled from: {}", self.who, self.called_from)
    }
}

/// A parsed trace event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum Event {
    SchedulerTransition(Transition),
    WorkerTransition(Transition),
    WorkerTransfer(WorkerTransfer),
}

impl Event {
    /// Parses a row of the given category.
    pub fn from_row(category: EventCategory, row: &Row) -> Result<Self, EventError> {
        match category {
            EventCategory::SchedulerTransition => {
                Transition::from_row(row).map(Self::SchedulerTransition)
            }
            EventCategory::WorkerTransition => Transition::from_row(row).map(Self::WorkerTransition),
            EventCategory::WorkerTransfer => WorkerTransfer::from_row(row).map(Self::WorkerTransfer),
        }
    }

    pub const fn category(&self) -> EventCategory {
        match self {
            Self::SchedulerTransition(_) => EventCategory::SchedulerTransition,
            Self::WorkerTransition(_) => EventCategory::WorkerTransition,
            Self::WorkerTransfer(_) => EventCategory::WorkerTransfer,
        }
    }

    /// When the event was observed.
    pub const fn observed_at(&self) -> DateTime<Utc> {
        match self {
            Self::SchedulerTransition(t) | Self::WorkerTransition(t) => t.time,
            Self::WorkerTransfer(x) => x.time,
        }
    }

    /// Lower end of the interval the event covers. For transfers this is `start`.
    pub const fn begins(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::SchedulerTransition(t) | Self::WorkerTransition(t) => t.begins,
            Self::WorkerTransfer(x) => x.start,
        }
    }

    /// Upper end of the interval the event covers. For transfers this is `stop`.
    pub const fn ends(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::SchedulerTransition(t) | Self::WorkerTransition(t) => t.ends,
            Self::WorkerTransfer(x) => x.stop,
        }
    }

    /// Task keys the event refers to.
    pub fn task_keys(&self) -> Vec<&str> {
        match self {
            Self::SchedulerTransition(t) | Self::WorkerTransition(t) => vec![t.key.as_str()],
            Self::WorkerTransfer(x) => x.keys.names().collect(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchedulerTransition(t) => t.render(f, "Scheduler transition"),
            Self::WorkerTransition(t) => t.render(f, "Worker transition"),
            Self::WorkerTransfer(x) => fmt::Display::fmt(x, f),
        }
    }
}

/// Renders a timestamp the way every text output does: RFC 3339, microseconds, `Z`.
pub fn fmt_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn fmt_opt_time(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(|| "none".to_string(), fmt_time)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn scheduler_row(key: &str, begins: &str, ends: &str) -> Row {
        [
            ("time", "100"),
            ("begins", begins),
            ("ends", ends),
            ("start", "waiting"),
            ("finish", "processing"),
            ("called_from", "tcp://10.0.0.1:8786"),
            ("stimulus_id", "update-graph-1"),
            ("key", key),
        ]
        .into_iter()
        .collect()
    }

    pub(crate) fn transfer_row(keys: &str) -> Row {
        [
            ("start", "10"),
            ("stop", "12"),
            ("middle", "11"),
            ("duration", "2.0"),
            ("keys", keys),
            ("total", "30"),
            ("bandwidth", "15"),
            ("compressed", "1.0"),
            ("who", "tcp://10.0.0.2:40000"),
            ("called_from", "tcp://10.0.0.3:40001"),
            ("type", "incoming_transfer"),
            ("time", "12.5"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn parses_scheduler_transition() {
        let row = scheduler_row("inc-1", "90", "nan");
        let event = Event::from_row(EventCategory::SchedulerTransition, &row).unwrap();

        assert_eq!(event.category(), EventCategory::SchedulerTransition);
        assert_eq!(event.task_keys(), ["inc-1"]);
        assert_eq!(event.begins(), DateTime::from_timestamp(90, 0));
        assert_eq!(event.ends(), None);

        let Event::SchedulerTransition(t) = event else {
            panic!("wrong variant");
        };
        assert_eq!(t.start, TaskState::Waiting);
        assert_eq!(t.finish, TaskState::Processing);
        assert_eq!(t.source.stimulus_id, "update-graph-1");
    }

    #[test]
    fn worker_rows_become_worker_transitions() {
        let row = scheduler_row("inc-1", "nan", "nan");
        let event = Event::from_row(EventCategory::WorkerTransition, &row).unwrap();
        assert!(matches!(event, Event::WorkerTransition(_)));
    }

    #[test]
    fn unknown_state_is_rejected() {
        let mut row = scheduler_row("k", "nan", "nan");
        row.insert("start", "unknown_state");
        let err = Transition::from_row(&row).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"invalid state in column `start`: unknown task state: "unknown_state""#
        );
    }

    #[test]
    fn empty_key_is_rejected() {
        let row = scheduler_row("  ", "nan", "nan");
        assert_eq!(Transition::from_row(&row).unwrap_err(), EventError::EmptyKey);
    }

    #[test]
    fn parses_transfer_with_many_keys() {
        let row = transfer_row(r#"{"X":10,"Y":20}"#);
        let event = Event::from_row(EventCategory::WorkerTransfer, &row).unwrap();

        assert_eq!(event.task_keys(), ["X", "Y"]);
        assert_eq!(event.begins(), DateTime::from_timestamp(10, 0));
        assert_eq!(event.ends(), DateTime::from_timestamp(12, 0));

        let Event::WorkerTransfer(x) = event else {
            panic!("wrong variant");
        };
        assert_eq!(x.n_tasks(), 2);
        assert_eq!(x.direction, TransferDirection::Incoming);
    }

    #[test]
    fn invalid_keys_literal_is_rejected() {
        let row = transfer_row("{'X': 10");
        let err = WorkerTransfer::from_row(&row).unwrap_err();
        assert!(matches!(err, EventError::InvalidKeys { .. }));
    }

    #[test]
    fn invalid_direction_is_rejected() {
        let mut row = transfer_row("{'X': 10}");
        row.insert("type", "sideways");
        let err = WorkerTransfer::from_row(&row).unwrap_err();
        assert!(matches!(err, EventError::InvalidDirection(_)));
    }

    #[test]
    fn infinite_transfer_metric_is_rejected() {
        let mut row = transfer_row("{'X': 10}");
        row.insert("bandwidth", "inf");
        let err = Event::from_row(EventCategory::WorkerTransfer, &row).unwrap_err();
        assert!(matches!(
            err,
            EventError::InvalidValue {
                column: "bandwidth",
                ..
            }
        ));
    }

    #[test]
    fn missing_transfer_column_is_reported() {
        let row: Row = [("keys", "{'X': 1}"), ("type", "outgoing")]
            .into_iter()
            .collect();
        assert_eq!(
            WorkerTransfer::from_row(&row).unwrap_err(),
            EventError::MissingColumn { column: "time" }
        );
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = Event::from_row(
            EventCategory::WorkerTransfer,
            &transfer_row("{('x', 0): 8}"),
        )
        .unwrap();
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""category":"worker_transfer""#));
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn scheduler_rendering() {
        let event = Event::from_row(
            EventCategory::SchedulerTransition,
            &scheduler_row("inc-1", "90", "nan"),
        )
        .unwrap();
        let rendered = event.to_string().replace('\t', "  ");
        insta::assert_snapshot!(rendered.trim_end(), @r"
        Scheduler transition for task inc-1
          Event time: 1970-01-01T00:01:40.000000Z  Begin time: 1970-01-01T00:01:30.000000Z  End time: none
          Start: waiting  Finish: processing
          Source:
            Called from: tcp://10.0.0.1:8786
            Stimulus ID: update-graph-1
        ");
    }
}
