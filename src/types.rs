//! Core engine types and configuration
//!
//! # Key Types
//!
//! - [`TemplateKind`] - the three kinds of template source a locator resolves
//! - [`EngineConfig`] - configuration for the engine, locator conventions and cache
//! - [`CacheMode`] - whether rendered output is memoized
//! - [`Expanded`] - the intermediate representation handed to an execution sink
//!
//! ```rust,ignore
//! use modx_engine::{EngineConfig, CacheMode};
//! use std::time::Duration;
//!
//! let config = EngineConfig::default()
//!     .with_namespace("site")
//!     .with_default_ttl(Duration::from_secs(600))
//!     .with_max_iterations(50);
//! ```

use std::fmt;
use std::time::Duration;

use serde_json::Value as JsonValue;

/// The kind of template being resolved
///
/// Each kind has its own subdirectory convention inside a template directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    Template,
    Layout,
    Component,
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TemplateKind::Template => "Template",
            TemplateKind::Layout => "Layout",
            TemplateKind::Component => "Component",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheMode {
    /// Always expand and execute; never read or write the cache store
    None,
    Normal,
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub(crate) namespace: String,
    pub(crate) default_ttl: Duration,
    pub(crate) max_iterations: usize,
    pub(crate) cache_mode: CacheMode,
    pub(crate) extension: String,
    pub(crate) layout_dir: String,
    pub(crate) component_dir: String,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache key namespace
    pub fn with_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the TTL used when a render does not pass its own
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the fixed-point iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    /// Set the template file extension (without the leading dot)
    pub fn with_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_layout_dir<S: Into<String>>(mut self, dir: S) -> Self {
        self.layout_dir = dir.into();
        self
    }

    pub fn with_component_dir<S: Into<String>>(mut self, dir: S) -> Self {
        self.component_dir = dir.into();
        self
    }

    /// Configuration that renders every call from scratch
    pub fn no_caching() -> Self {
        Self {
            cache_mode: CacheMode::None,
            ..Self::default()
        }
    }

    // Accessors
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }
    pub fn cache_mode(&self) -> CacheMode {
        self.cache_mode
    }
    pub fn extension(&self) -> &str {
        &self.extension
    }
    pub fn layout_dir(&self) -> &str {
        &self.layout_dir
    }
    pub fn component_dir(&self) -> &str {
        &self.component_dir
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            namespace: "template".to_string(),
            default_ttl: Duration::from_secs(3600),
            max_iterations: 100,
            cache_mode: CacheMode::Normal,
            extension: "modx".to_string(),
            layout_dir: "layouts".to_string(),
            component_dir: "components".to_string(),
        }
    }
}

/// A single prop binding inside a component frame
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Value known at expansion time (literal props and context lookups)
    Value(JsonValue),
    /// Name resolved when the expanded output is executed (loop-bound names)
    Alias(String),
}

/// Props introduced by one component inclusion
///
/// Frames are referenced by index from `scope` instructions in the expanded text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub(crate) component: String,
    pub(crate) bindings: Vec<(String, Binding)>,
}

impl Frame {
    pub fn new<S: Into<String>>(component: S) -> Self {
        Self {
            component: component.into(),
            bindings: Vec::new(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn bindings(&self) -> &[(String, Binding)] {
        &self.bindings
    }

    pub(crate) fn bind(&mut self, name: String, binding: Binding) {
        // Later props with the same name win, like attribute overrides
        self.bindings.retain(|(existing, _)| existing != &name);
        self.bindings.push((name, binding));
    }
}

/// Output of directive expansion
///
/// The text still contains host-level instructions (loops, echoes, component
/// scopes); an [`ExecutionSink`](crate::renderer::ExecutionSink) evaluates them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expanded {
    pub(crate) text: String,
    pub(crate) frames: Vec<Frame>,
}

impl Expanded {
    pub fn new(text: String, frames: Vec<Frame>) -> Self {
        Self { text, frames }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
