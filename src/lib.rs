//! Directive-based text templating with layouts, components and a render cache
//!
//! Templates are plain text (usually HTML) with a small set of directives:
//!
//! - `<: layout "main" :>` merges the rest of the document into a layout's
//!   `<: content :>` placeholder
//! - `<: for item in items :> ... <: endfor :>` and `<: for item, i in items :>`
//!   repeat a block per element (or per key of an object)
//! - `<: component card title="Hi" :post="item" >` inlines a reusable fragment
//!   with its own props; `:`-prefixed props name a variable in the caller
//! - `<: name :>` prints a value, HTML-escaped
//! - `# text #` becomes an HTML comment
//!
//! Rendering is two stages. Directive expansion runs to a fixed point and
//! leaves host-level instructions behind; an execution sink then evaluates
//! them against the data. Finished output is memoized by template name and a
//! fingerprint of the data.
//!
//! # Examples
//!
//! ```rust,ignore
//! use modx_engine::EngineBuilder;
//! use serde_json::json;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = EngineBuilder::new()
//!     .with_template_dirs(["templates"])
//!     .build()?;
//!
//! let html = engine
//!     .view()
//!     .with([("title", json!("Hello World")), ("items", json!(["a", "b"]))])
//!     .render("home", None)?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cache;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod ir;
pub mod locator;
pub mod parser;
pub mod renderer;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod utils;
pub mod value;

// Re-export commonly used types
pub use builder::EngineBuilder;
pub use cache::{CacheStore, FileSystemStore, Fingerprint, MemoryStore, RenderCache};
pub use engine::{Engine, View};
pub use error::{Error, Result};
pub use locator::{FileSystemLocator, TemplateLocator};
pub use renderer::{ExecutionSink, Renderer};
pub use types::{CacheMode, EngineConfig, Expanded, TemplateKind};
pub use value::Context;
