//! Loading trace CSV files into a [`TaskHandler`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::event::{Event, EventError};
use crate::handler::{HandlerError, TaskHandler};
use crate::row::Row;
use crate::state::EventCategory;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A data row could not be parsed. Rows are numbered from 1, header excluded.
    #[error("{category} row {row}: {source}")]
    Row {
        category: EventCategory,
        row: usize,
        #[source]
        source: EventError,
    },

    #[error("{category} row {row}: {source}")]
    Handler {
        category: EventCategory,
        row: usize,
        #[source]
        source: HandlerError,
    },
}

/// Parses every row of a CSV stream as `category` events and adds them to `handler`.
///
/// Stops at the first bad row. Rows before it stay ingested; the bad row
/// itself leaves no trace in the handler. Returns the number of events added.
pub fn extract_metadata<R: io::Read>(
    reader: R,
    category: EventCategory,
    handler: &mut TaskHandler,
) -> Result<usize, IngestError> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut ingested = 0;
    for (idx, record) in reader.records().enumerate() {
        let row = idx + 1;
        let record = record?;
        let event = Event::from_row(category, &Row::from_record(&headers, &record))
            .map_err(|source| IngestError::Row {
                category,
                row,
                source,
            })?;
        handler
            .add_event(event)
            .map_err(|source| IngestError::Handler {
                category,
                row,
                source,
            })?;
        ingested += 1;
    }

    tracing::debug!(%category, events = ingested, tasks = handler.len(), "ingested events");
    Ok(ingested)
}

/// Reads a whole trace file into memory, then ingests it.
pub fn extract_metadata_from_path(
    path: &Path,
    category: EventCategory,
    handler: &mut TaskHandler,
) -> Result<usize, IngestError> {
    let data = fs::read(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    extract_metadata(data.as_slice(), category, handler)
}
