//! Durable crawl output
//!
//! Extracted pages are appended to a JSONL records file with size-based
//! rotation. Write failures are surfaced to the caller but are never fatal to
//! the pipeline.

mod records;

pub use records::{Record, RecordWriter};

use thiserror::Error;

/// Errors that can occur while writing crawl output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to format record: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
