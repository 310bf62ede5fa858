//! Error handling for modx-engine
//!
//! This module provides the error type shared by every stage of the engine:
//! locating template files, expanding directives, executing the expanded
//! output and talking to the render cache.
//!
//! # Error Types
//!
//! - [`Error::NotFound`] - a template, layout or component file could not be located
//! - [`Error::ParseError`] - malformed host instructions reached the execution stage
//! - [`Error::RenderError`] - execution failed (e.g. a loop over a missing collection)
//! - [`Error::IterationLimit`] - directive expansion did not reach a fixed point
//! - [`Error::EmptyOutput`] - a render produced no output at all
//! - [`Error::CacheError`] - the cache store failed
//! - [`Error::JsonError`] - JSON serialization errors
//! - [`Error::IoError`] - file system errors
//!
//! Unbound variables and recursive component inclusions are deliberately not
//! errors: they are rendered as inline diagnostic comments instead.
//!
//! # Usage
//!
//! ```rust,ignore
//! use modx_engine::{Context, Error};
//!
//! match engine.render("home", &Context::new(), None) {
//!     Ok(html) => println!("{html}"),
//!     Err(Error::NotFound { name, .. }) => println!("missing template {name}"),
//!     Err(Error::IterationLimit { limit }) => println!("directive cycle after {limit} passes"),
//!     Err(err) => println!("Other error: {err}"),
//! }
//! ```

use std::borrow::Cow;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::TemplateKind;

/// Error type for all modx-engine operations
#[derive(Error, Debug)]
pub enum Error {
    /// A template file could not be resolved in any configured directory
    ///
    /// The display form lists every directory that was searched.
    #[error("{kind} {name} not found, searched in: {}", display_dirs(.searched))]
    NotFound {
        kind: TemplateKind,
        name: String,
        searched: Vec<PathBuf>,
    },

    /// Malformed host instructions in expanded output
    #[error("Parse error: {0}")]
    ParseError(Cow<'static, str>),

    /// Execution of the expanded output failed
    #[error("Render error: {0}")]
    RenderError(Cow<'static, str>),

    /// The fixed-point driver gave up before the output stabilised
    ///
    /// This almost always means two directives keep reintroducing each other.
    #[error("Directive expansion did not settle after {limit} iterations (possible directive cycle)")]
    IterationLimit { limit: usize },

    /// A render produced an empty string
    #[error("Rendered output is empty for template {template}")]
    EmptyOutput { template: String },

    /// The cache store failed to read or write an entry
    #[error("Cache error: {0}")]
    CacheError(Cow<'static, str>),

    /// Automatically converted from `serde_json::Error`
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Automatically converted from `std::io::Error`
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    if dirs.is_empty() {
        return "<no template directories configured>".to_string();
    }
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Create a parse error with a static string
    pub fn parse_static(msg: &'static str) -> Self {
        Error::ParseError(Cow::Borrowed(msg))
    }

    /// Create a parse error with an owned string
    pub fn parse_owned(msg: String) -> Self {
        Error::ParseError(Cow::Owned(msg))
    }

    /// Create a render error with a static string
    pub fn render_static(msg: &'static str) -> Self {
        Error::RenderError(Cow::Borrowed(msg))
    }

    /// Create a render error with an owned string
    ///
    /// ```rust,ignore
    /// let error = Error::render_owned(format!("Undefined collection '{}'", name));
    /// ```
    pub fn render_owned(msg: String) -> Self {
        Error::RenderError(Cow::Owned(msg))
    }

    /// Create a cache error with a static string
    pub fn cache_static(msg: &'static str) -> Self {
        Error::CacheError(Cow::Borrowed(msg))
    }

    /// Create a cache error with an owned string
    pub fn cache_owned(msg: String) -> Self {
        Error::CacheError(Cow::Owned(msg))
    }

    /// Create an IO error from a message
    pub fn io(msg: String) -> Self {
        Error::IoError(std::io::Error::new(std::io::ErrorKind::Other, msg))
    }

    /// Whether this error came from template resolution
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// Result type alias for modx-engine operations
pub type Result<T> = std::result::Result<T, Error>;
