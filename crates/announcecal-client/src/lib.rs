//! CLI, message decoding and the import pipeline
//!
//! This crate provides the `announcecal` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod import;
pub mod message;
pub mod secret;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use import::{ImportOptions, ImportOutcome, ImportReport, Importer};
