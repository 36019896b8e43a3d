//! Core domain logic for Dask trace reconstruction.
//!
//! This crate turns the rows of Dask-Mofka trace files into per-task timelines:
//! - Event model: scheduler transitions, worker transitions and worker transfers
//! - Task aggregation: routing events onto tasks, deriving start/end bounds
//! - Ingestion: reading the CSV files the capture plugin writes
//! - Tabular view: flattening a finished task map back into per-category tables

pub mod event;
pub mod handler;
pub mod ingest;
pub mod keys;
pub mod row;
pub mod state;
pub mod tabular;
pub mod task;
pub mod time;

pub use event::{
    Event, EventError, EventSource, Transition, WorkerTransfer, fmt_opt_time, fmt_time,
};
pub use handler::{HandlerError, TaskHandler};
pub use ingest::{IngestError, extract_metadata, extract_metadata_from_path};
pub use keys::{KeysError, TransferKeys, parse_keys};
pub use row::Row;
pub use state::{EventCategory, TaskState, TransferDirection, UnknownVariant};
pub use tabular::{Table, TabularView};
pub use task::Task;
pub use time::{EventTimes, TimeError, merge_lower_bound};
