//! Show command: inspect a saved snapshot from the terminal.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use wfmeta_core::{TaskHandler, fmt_opt_time};

use super::export::load_snapshot;

/// Writes either the task name listing or one task's rendering.
pub fn write_report<W: Write>(
    out: &mut W,
    handler: &TaskHandler,
    task: Option<&str>,
) -> Result<()> {
    if let Some(name) = task {
        let task = handler
            .get_task(name)
            .with_context(|| format!("no task named {name:?} in snapshot"))?;
        write!(out, "{task}")?;
        return Ok(());
    }

    writeln!(out, "{} tasks, {} events", handler.len(), handler.event_count())?;
    for task in handler.tasks() {
        let start = fmt_opt_time(task.t_start());
        writeln!(out, "{}\t{} events\tstart {start}", task.name(), task.len())?;
    }
    Ok(())
}

/// Runs the show command against a snapshot file.
pub fn run<W: Write>(out: &mut W, snapshot: &Path, task: Option<&str>) -> Result<()> {
    let handler = load_snapshot(snapshot)?;
    tracing::debug!(tasks = handler.len(), "snapshot loaded");
    write_report(out, &handler, task)
}
