//! datex-flatten library
//!
//! This crate provides the core functionality for the `datex-flatten` binary.
//! Keep the crate root minimal — implementation and tests live in their modules.
//!
//! ## Overview
//!
//! The library turns multiply-nested road-traffic situation XML into flat
//! Parquet tables, one row per situation record:
//!
//! - [`parser`] - Streaming flattener (XML events → flat records) and the chunked Parquet writer
//! - [`cli`] - Command-line interface orchestrating the conversion workflow
//! - [`config`] - Resolved pipeline configuration and TOML loading
//! - [`models`] - Flat record type, missing-identifier policy, conversion summary
//! - [`errors`] - Error types used throughout the application
//!
//! ## Example Usage
//!
//! The typical flow opens a feed as a lazy record stream and hands it to the
//! writer, which batches, merges and deduplicates into one output file:
//!
//! ```no_run
//! use datex_flatten::config::ResolvedConfig;
//! use datex_flatten::errors::AppResult;
//! use datex_flatten::parser::{write_records, RecordStream};
//! use std::path::Path;
//!
//! # fn example() -> AppResult<()> {
//! let config = ResolvedConfig::default();
//! let records = RecordStream::from_path(Path::new("wegwerkzaamheden.xml"), &config)?;
//! let summary = write_records(records, Path::new("wegwerkzaamheden.parquet"), &config, true)?;
//! println!("{} rows, {} columns", summary.rows, summary.columns);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod parser;
pub mod utils;
