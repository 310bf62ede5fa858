//! Builder pattern API for constructing Engine instances
//!
//! Collects the template locator, cache store, execution sink and
//! configuration, filling in defaults for whatever is not given.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{CacheStore, FileSystemStore, MemoryStore, RenderCache};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::locator::{FileSystemLocator, TemplateLocator};
use crate::renderer::{ExecutionSink, Renderer};
use crate::types::{CacheMode, EngineConfig};

/// Builder for constructing Engine instances
///
/// # Examples
///
/// ```rust,ignore
/// use modx_engine::EngineBuilder;
///
/// let engine = EngineBuilder::new()
///     .with_template_dirs(["templates", "shared/templates"])
///     .with_cache_dir("/tmp/modx-cache")
///     .namespace("site")
///     .default_ttl(Duration::from_secs(600))
///     .build()?;
/// ```
pub struct EngineBuilder {
    locator: Option<Box<dyn TemplateLocator>>,
    template_dirs: Vec<PathBuf>,
    root: Option<PathBuf>,
    create_dirs: bool,
    store: Option<StoreChoice>,
    sink: Option<Box<dyn ExecutionSink>>,
    config: EngineConfig,
}

enum StoreChoice {
    Custom(Box<dyn CacheStore>),
    Directory(PathBuf),
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            locator: None,
            template_dirs: Vec::new(),
            root: None,
            create_dirs: false,
            store: None,
            sink: None,
            config: EngineConfig::default(),
        }
    }

    /// Use a custom locator instead of searching template directories
    pub fn with_locator(mut self, locator: Box<dyn TemplateLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Template directories, searched in the given order
    pub fn with_template_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.template_dirs
            .extend(dirs.into_iter().map(|d| d.as_ref().to_path_buf()));
        self
    }

    /// Base directory for relative template directories (defaults to the working directory)
    pub fn with_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.root = Some(root.as_ref().to_path_buf());
        self
    }

    /// Create missing template directories instead of failing
    pub fn create_missing_dirs(mut self, create: bool) -> Self {
        self.create_dirs = create;
        self
    }

    pub fn with_store(mut self, store: Box<dyn CacheStore>) -> Self {
        self.store = Some(StoreChoice::Custom(store));
        self
    }

    /// Keep rendered output in process memory (the default)
    pub fn with_memory_store(mut self) -> Self {
        self.store = Some(StoreChoice::Custom(Box::new(MemoryStore::new())));
        self
    }

    /// Keep rendered output as files in `dir`
    pub fn with_cache_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.store = Some(StoreChoice::Directory(dir.as_ref().to_path_buf()));
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn ExecutionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Use a custom engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.config = self.config.with_namespace(namespace);
        self
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config = self.config.with_default_ttl(ttl);
        self
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.config = self.config.with_max_iterations(max_iterations);
        self
    }

    /// Render every call from scratch (useful during development)
    pub fn no_caching(mut self) -> Self {
        self.config = self.config.with_cache_mode(CacheMode::None);
        self
    }

    /// Build the Engine instance
    pub fn build(self) -> Result<Engine> {
        let locator: Box<dyn TemplateLocator> = match self.locator {
            Some(locator) => locator,
            None if self.template_dirs.is_empty() => {
                return Err(Error::parse_static(
                    "No template source provided. Use with_template_dirs() or with_locator()",
                ));
            }
            None => Box::new(
                FileSystemLocator::from_paths(
                    &self.template_dirs,
                    self.root.as_deref(),
                    self.create_dirs,
                )?
                .with_conventions(&self.config),
            ),
        };

        let store: Box<dyn CacheStore> = match self.store {
            Some(StoreChoice::Custom(store)) => store,
            Some(StoreChoice::Directory(dir)) => Box::new(FileSystemStore::new(dir)?),
            None => Box::new(MemoryStore::new()),
        };

        let cache = RenderCache::new(store, self.config.namespace(), self.config.default_ttl());
        let sink = self.sink.unwrap_or_else(|| Box::new(Renderer::new()));

        tracing::debug!(
            namespace = self.config.namespace(),
            max_iterations = self.config.max_iterations(),
            "engine built"
        );

        Ok(Engine {
            locator,
            cache,
            sink,
            config: self.config,
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
