//! Output adapters for a finished task map.
//!
//! Three mutually exclusive representations:
//! - txt: every task's rendering, in handler order
//! - snapshot: the whole handler as JSON, gzip-compressed when the path ends in `.gz`
//! - csv: one `<category>_df.csv` file per event category

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use wfmeta_core::TaskHandler;

use crate::cli::OutputFormat;

/// Writes the handler in the requested format.
pub fn run(handler: &TaskHandler, format: OutputFormat, output: &Path) -> Result<()> {
    match format {
        OutputFormat::Txt => {
            tracing::info!(path = %output.display(), "saving txt file");
            save_text(handler, output)
        }
        OutputFormat::Snapshot => {
            tracing::info!(path = %output.display(), "saving snapshot");
            save_snapshot(handler, output)
        }
        OutputFormat::Csv => {
            tracing::info!(dir = %output.display(), "saving per-category csv files");
            let written = save_tables(handler, output)?;
            tracing::debug!(files = written.len(), "csv files written");
            Ok(())
        }
    }
}

/// Writes every task's rendering, one block after another.
pub fn write_text<W: Write>(handler: &TaskHandler, mut writer: W) -> Result<()> {
    for task in handler.tasks() {
        write!(writer, "{task}")?;
    }
    Ok(())
}

pub fn save_text(handler: &TaskHandler, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_text(handler, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

/// Serializes the whole handler so [`load_snapshot`] can restore it.
pub fn save_snapshot(handler: &TaskHandler, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    if is_gzip(path) {
        let mut encoder = GzEncoder::new(writer, Compression::default());
        serde_json::to_writer(&mut encoder, handler).context("failed to serialize snapshot")?;
        encoder.finish()?.flush()?;
    } else {
        serde_json::to_writer_pretty(&mut writer, handler)
            .context("failed to serialize snapshot")?;
        writer.flush()?;
    }
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<TaskHandler> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let handler = if is_gzip(path) {
        serde_json::from_reader(GzDecoder::new(reader))
    } else {
        serde_json::from_reader(reader)
    }
    .with_context(|| format!("invalid snapshot {}", path.display()))?;

    Ok(handler)
}

/// Writes one CSV file per event category into `dir`, creating it if needed.
pub fn save_tables(handler: &TaskHandler, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let view = handler.to_tabular_view();
    let mut written = Vec::new();
    for table in view.tables() {
        let path = dir.join(format!("{}_df.csv", table.category()));
        let file =
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
        table
            .write_csv(BufWriter::new(file))
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
