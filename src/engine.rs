//! Rendering facade
//!
//! [`Engine`] ties the pieces together: it resolves a template through its
//! [`TemplateLocator`], expands directives with a [`Compiler`], hands the
//! result to an [`ExecutionSink`] and memoizes the output in a
//! [`RenderCache`]. Every render starts from fresh expansion state, so
//! nothing but the cache is shared between calls.
//!
//! [`View`] is the convenience front end: it accumulates data and an optional
//! default layout, then renders.
//!
//! ```rust,ignore
//! use modx_engine::EngineBuilder;
//! use serde_json::json;
//!
//! let engine = EngineBuilder::new()
//!     .with_template_dirs(["templates"])
//!     .build()?;
//!
//! let html = engine
//!     .view()
//!     .with([("title", json!("Home")), ("items", json!(["a", "b"]))])
//!     .layout("main")
//!     .render("home", None)?;
//! ```

use std::time::Duration;

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::builder::EngineBuilder;
use crate::cache::{Fingerprint, RenderCache};
use crate::compiler::Compiler;
use crate::error::{Error, Result};
use crate::locator::TemplateLocator;
use crate::renderer::ExecutionSink;
use crate::types::{CacheMode, EngineConfig, Expanded, TemplateKind};
use crate::value::Context;

pub struct Engine {
    pub(crate) locator: Box<dyn TemplateLocator>,
    pub(crate) cache: RenderCache,
    pub(crate) sink: Box<dyn ExecutionSink>,
    pub(crate) config: EngineConfig,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn locator(&self) -> &dyn TemplateLocator {
        self.locator.as_ref()
    }

    /// Render a named template
    ///
    /// `ttl` overrides the configured default for this entry only. A cached
    /// result is returned without expanding anything, but the template must
    /// still exist.
    pub fn render(&self, name: &str, context: &Context, ttl: Option<Duration>) -> Result<String> {
        self.render_with_layout(name, context, None, ttl)
    }

    /// Render a named template, merging it into `layout` if it has no layout
    /// directive of its own
    pub fn render_with_layout(
        &self,
        name: &str,
        context: &Context,
        layout: Option<&str>,
        ttl: Option<Duration>,
    ) -> Result<String> {
        self.locator.resolve(name, TemplateKind::Template)?;

        if self.config.cache_mode() == CacheMode::None {
            return self.render_uncached(name, context, layout);
        }

        let fingerprint = Fingerprint::with_layout(context, layout)?;
        self.cache.get_or_render(name, &fingerprint, ttl, || {
            self.render_uncached(name, context, layout)
        })
    }

    /// Expand a template without executing it
    pub fn expand(&self, name: &str, context: &Context) -> Result<Expanded> {
        self.expand_with_layout(name, context, None)
    }

    fn expand_with_layout(
        &self,
        name: &str,
        context: &Context,
        layout: Option<&str>,
    ) -> Result<Expanded> {
        let source = self.locator.load(name, TemplateKind::Template)?;
        Compiler::new(self.locator.as_ref(), self.config.max_iterations())
            .compile(&source, context, layout)
    }

    fn render_uncached(&self, name: &str, context: &Context, layout: Option<&str>) -> Result<String> {
        let expanded = self.expand_with_layout(name, context, layout)?;
        let output = self.sink.execute(&expanded, context)?;

        if output.is_empty() {
            tracing::error!(template = name, "rendered output is empty");
            return Err(Error::EmptyOutput {
                template: name.to_string(),
            });
        }

        tracing::debug!(template = name, bytes = output.len(), "rendered template");
        Ok(output)
    }

    /// Clear cached output for one template, or for all of them
    pub fn clear_cache(&self, template: Option<&str>) -> Result<bool> {
        self.cache.clear(template)
    }

    /// Start a view with an empty context
    pub fn view(&self) -> View<'_> {
        View::new(self)
    }
}

/// Accumulates render data for an [`Engine`]
pub struct View<'e> {
    engine: &'e Engine,
    context: Context,
    layout: Option<String>,
}

impl<'e> View<'e> {
    pub fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            context: Context::new(),
            layout: None,
        }
    }

    /// Store a value under `key`, replacing any previous value
    pub fn set<K: Into<String>, V: Into<JsonValue>>(mut self, key: K, value: V) -> Self {
        self.context.insert(key, value);
        self
    }

    /// Store several values at once, in iteration order
    pub fn with<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<JsonValue>,
    {
        self.context.extend(values);
        self
    }

    /// Merge the fields of a serializable value
    pub fn with_serialize<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.context.extend_from_serialize(value)?;
        Ok(self)
    }

    /// Default layout, used when the template has no layout directive
    pub fn layout<S: Into<String>>(mut self, name: S) -> Self {
        self.layout = Some(name.into());
        self
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn render(&self, template: &str, ttl: Option<Duration>) -> Result<String> {
        self.engine
            .render_with_layout(template, &self.context, self.layout.as_deref(), ttl)
    }

    pub fn clear_cache(&self, template: Option<&str>) -> Result<bool> {
        self.engine.clear_cache(template)
    }
}
