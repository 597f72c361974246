//! jlingest - hotel review ingestion from newline-delimited JSON exports.
//!
//! JL files are picked up from a local directory or an S3 bucket, claimed so
//! that concurrent workers never process the same file twice, and imported
//! line by line into SQLite.

pub mod cli;
pub mod config;
pub mod ingest;
pub mod models;
pub mod repository;
pub mod schema;
pub mod server;
pub mod source;
