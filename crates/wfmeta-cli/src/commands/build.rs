//! Build command: trace directory in, task timelines out.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use wfmeta_core::{EventCategory, TaskHandler, extract_metadata_from_path};

use crate::cli::OutputFormat;
use crate::commands::export;
use crate::config::Config;

/// Checks the trace directory and returns its input files in ingestion order.
///
/// Fails before anything is parsed if the directory or any file is missing.
pub fn locate_inputs(directory: &Path) -> Result<Vec<(EventCategory, PathBuf)>> {
    if !directory.exists() {
        bail!(
            "Provided directory path {} does not exist.",
            directory.display()
        );
    }
    if !directory.is_dir() {
        bail!(
            "Provided path {} is not a directory. Please provide the path to the folder containing your Mofka-Dask output files.",
            directory.display()
        );
    }

    EventCategory::INGEST_ORDER
        .into_iter()
        .map(|category| {
            let path = directory.join(category.file_name());
            if !path.is_file() {
                bail!("There is no {}.", path.display());
            }
            Ok((category, path))
        })
        .collect()
}

/// Ingests every trace file of a directory and sorts the resulting tasks.
pub fn build_handler(directory: &Path) -> Result<TaskHandler> {
    let inputs = locate_inputs(directory)?;
    tracing::info!("all files present and accounted for");

    let mut handler = TaskHandler::new();
    for (category, path) in &inputs {
        tracing::info!(%category, path = %path.display(), "extracting metadata");
        let events = extract_metadata_from_path(path, *category, &mut handler)
            .with_context(|| format!("failed to ingest {}", path.display()))?;
        tracing::debug!(%category, events, tasks = handler.len(), "file ingested");
    }

    tracing::info!(tasks = handler.len(), "sorting compiled tasks");
    handler.sort_tasks_by_time();
    Ok(handler)
}

/// Runs the build command.
pub fn run(
    directory: &Path,
    format: Option<OutputFormat>,
    output: Option<&Path>,
    config: &Config,
) -> Result<()> {
    let format = format.unwrap_or_else(|| {
        tracing::info!(format = %config.format, "no output format given, using default");
        config.format
    });
    let output = output.map_or_else(
        || {
            let path = config.output_for(format).to_path_buf();
            tracing::info!(path = %path.display(), "no output path given, using default");
            path
        },
        Path::to_path_buf,
    );

    let handler = build_handler(directory)?;
    export::run(&handler, format, &output)?;

    tracing::info!("done");
    Ok(())
}
