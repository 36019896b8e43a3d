//! Dask trace metadata CLI library.
//!
//! This crate provides the CLI interface for rebuilding task timelines.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
