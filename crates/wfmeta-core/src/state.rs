//! Closed vocabularies found in trace files.
//!
//! Each enum is the single source of truth for the strings it accepts and
//! emits. Parsing is strict: anything outside the vocabulary is an error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A string that does not belong to the expected vocabulary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `Display`, `FromStr` and string-based serde for a vocabulary enum.
macro_rules! string_enum {
    ($name:ident, $kind:literal) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s.trim()).ok_or_else(|| UnknownVariant {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

/// Task states as reported by the scheduler and the workers.
///
/// The values carry no ordering; a transition is an opaque pair of labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Released,
    Waiting,
    Queued,
    Processing,
    Memory,
    Forgotten,
}

impl TaskState {
    pub const ALL: [Self; 6] = [
        Self::Released,
        Self::Waiting,
        Self::Queued,
        Self::Processing,
        Self::Memory,
        Self::Forgotten,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Released => "released",
            Self::Waiting => "waiting",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Memory => "memory",
            Self::Forgotten => "forgotten",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == s)
    }
}

string_enum!(TaskState, "task state");

/// Direction of a worker transfer, seen from the reporting worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferDirection {
    Incoming,
    Outgoing,
}

impl TransferDirection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Outgoing => "outgoing",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "incoming" | "incoming_transfer" => Some(Self::Incoming),
            "outgoing" | "outgoing_transfer" => Some(Self::Outgoing),
            _ => None,
        }
    }
}

string_enum!(TransferDirection, "transfer direction");

/// The kind of trace file an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventCategory {
    SchedulerTransition,
    WorkerTransition,
    WorkerTransfer,
}

impl EventCategory {
    /// Categories in the order their files are ingested.
    pub const INGEST_ORDER: [Self; 3] = [
        Self::SchedulerTransition,
        Self::WorkerTransfer,
        Self::WorkerTransition,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SchedulerTransition => "scheduler_transition",
            Self::WorkerTransition => "worker_transition",
            Self::WorkerTransfer => "worker_transfer",
        }
    }

    /// Short tag used by the capture tooling (`SCHED`, `WTRANS`, `WXFER`).
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::SchedulerTransition => "SCHED",
            Self::WorkerTransition => "WTRANS",
            Self::WorkerTransfer => "WXFER",
        }
    }

    /// Name of the CSV file holding this category inside a trace directory.
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::SchedulerTransition => "scheduler_transition.csv",
            Self::WorkerTransition => "worker_transition.csv",
            Self::WorkerTransfer => "worker_transfer.csv",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        Self::INGEST_ORDER
            .into_iter()
            .find(|category| category.as_str() == s || category.tag() == s)
    }
}

string_enum!(EventCategory, "event category");
