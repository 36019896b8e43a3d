//! CLI subcommand implementations.

pub mod build;
pub mod export;
pub mod show;
