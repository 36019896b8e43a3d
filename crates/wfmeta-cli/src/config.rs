//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;

/// Application configuration.
///
/// Supplies the defaults `build` falls back to when a flag is omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Output format used when `--format` is not given.
    pub format: OutputFormat,
    /// Destination of the txt output.
    pub text_output: PathBuf,
    /// Destination of the snapshot output.
    pub snapshot_output: PathBuf,
    /// Directory receiving the per-category CSV files.
    pub csv_output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: OutputFormat::Txt,
            text_output: PathBuf::from("compiled_tasks.txt"),
            snapshot_output: PathBuf::from("compiled_tasks.json.gz"),
            csv_output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // WFMETA_FORMAT, WFMETA_TEXT_OUTPUT, ...
        figment = figment.merge(Env::prefixed("WFMETA_"));

        figment.extract()
    }

    /// Default output path for a format.
    pub fn output_for(&self, format: OutputFormat) -> &Path {
        match format {
            OutputFormat::Txt => &self.text_output,
            OutputFormat::Snapshot => &self.snapshot_output,
            OutputFormat::Csv => &self.csv_output_dir,
        }
    }
}

/// Returns the platform-specific config directory.
///
/// On Linux: `~/.config/wfmeta`
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("wfmeta"))
}
