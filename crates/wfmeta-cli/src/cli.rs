//! Command-line argument definitions.

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Extracts metadata objects from Dask-Mofka trace files.
///
/// Reads the scheduler transition, worker transfer and worker transition
/// CSV files of one run and reassembles them into per-task timelines.
#[derive(Debug, Parser)]
#[command(name = "wfmeta-dask", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build task timelines from a trace directory and write them out.
    Build {
        /// Directory holding the trace CSV files.
        directory: PathBuf,

        /// Output format.
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (txt, snapshot) or directory (csv).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect a snapshot written by `build --format snapshot`.
    Show {
        /// Snapshot file.
        snapshot: PathBuf,

        /// Print this task instead of listing task names.
        #[arg(long)]
        task: Option<String>,
    },
}

/// Output representation written by `build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One human-readable block per task.
    #[default]
    Txt,
    /// The whole task map as JSON, gzip-compressed for `.gz` paths.
    Snapshot,
    /// One CSV file per event category.
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Txt => "txt",
            Self::Snapshot => "snapshot",
            Self::Csv => "csv",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_build_arguments() {
        let cli = Cli::try_parse_from([
            "wfmeta-dask",
            "-v",
            "build",
            "traces/run-1",
            "--format",
            "csv",
            "-o",
            "out",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Some(Commands::Build {
            directory,
            format,
            output,
        }) = cli.command
        else {
            panic!("expected build");
        };
        assert_eq!(directory, PathBuf::from("traces/run-1"));
        assert_eq!(format, Some(OutputFormat::Csv));
        assert_eq!(output, Some(PathBuf::from("out")));
    }

    #[test]
    fn rejects_unknown_format() {
        assert!(Cli::try_parse_from(["wfmeta-dask", "build", "dir", "-f", "pickle"]).is_err());
    }
}
