//! Content extraction seam
//!
//! The crawl engine never interprets page content itself; everything
//! site-shaped goes through the [`Extractor`] trait. The built-in
//! [`HtmlExtractor`] covers ordinary HTML sites; a custom impl can be swapped
//! in for anything else without touching the engine.

mod html;

pub use html::HtmlExtractor;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Errors produced while extracting content from a fetched page
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Malformed content: {0}")]
    Malformed(String),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// A table lifted out of a page, row-major
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub rows: Vec<Vec<String>>,
}

/// Turns raw page content into text, links, and auxiliary assets
///
/// Implementations must be thread-safe; one extractor instance is shared by
/// every parse worker.
pub trait Extractor: Send + Sync {
    /// Returns the page's merged visible text
    fn extract_text(&self, content: &[u8], url: &Url) -> Result<String, ExtractError>;

    /// Returns outbound links worth following, as absolute URLs
    fn extract_links(&self, content: &[u8], url: &Url) -> Vec<String>;

    /// Returns image URLs referenced by the page
    fn extract_images(&self, content: &[u8], url: &Url) -> Vec<String>;

    /// Returns linked document files (PDFs and the like)
    fn extract_files(&self, content: &[u8], url: &Url) -> Vec<String>;

    /// Returns the page's tables
    fn extract_tables(&self, content: &[u8], url: &Url) -> Vec<Table>;

    /// Returns the link to the next content item, for single-site watching
    fn next_link(&self, content: &[u8], url: &Url) -> Option<String>;
}
