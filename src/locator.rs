//! Template locators
//!
//! A [`TemplateLocator`] turns a template name plus its [`TemplateKind`] into a
//! file on disk. [`FileSystemLocator`] searches an ordered list of template
//! directories; the first directory containing a match wins.
//!
//! Within each directory the lookup order is:
//!
//! - layouts: `<dir>/<layout_dir>/<name>.<ext>`, then `<dir>/<name>.<ext>`
//! - components: `<dir>/<component_dir>/<name>.<ext>`, then `<dir>/<name>.<ext>`
//! - templates: `<dir>/<name>.<ext>`

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{EngineConfig, TemplateKind};

/// Resolves template names to files
pub trait TemplateLocator: Send + Sync {
    /// Find the file for `name`, or fail with [`Error::NotFound`]
    fn resolve(&self, name: &str, kind: TemplateKind) -> Result<PathBuf>;

    /// Resolve and read a template source
    fn load(&self, name: &str, kind: TemplateKind) -> Result<String> {
        let path = self.resolve(name, kind)?;
        std::fs::read_to_string(&path).map_err(|e| {
            Error::io(format!(
                "Failed to read template file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

/// Locates templates in an ordered list of directories
#[derive(Debug, Clone)]
pub struct FileSystemLocator {
    dirs: Vec<PathBuf>,
    root: PathBuf,
    extension: String,
    layout_dir: String,
    component_dir: String,
}

impl FileSystemLocator {
    /// Create a locator over the given directories without validating them
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        let defaults = EngineConfig::default();
        Self {
            dirs,
            root: PathBuf::new(),
            extension: defaults.extension,
            layout_dir: defaults.layout_dir,
            component_dir: defaults.component_dir,
        }
    }

    /// Create a locator from paths relative to `root`
    ///
    /// `root` defaults to the current working directory. Every path must name
    /// an existing directory unless `create` is set, in which case missing
    /// directories are created.
    pub fn from_paths<I, P>(paths: I, root: Option<&Path>, create: bool) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let root = match root {
            Some(root) => root.canonicalize().unwrap_or_else(|_| root.to_path_buf()),
            None => std::env::current_dir()?,
        };

        let mut locator = Self::new(Vec::new());
        locator.root = root;
        for path in paths {
            locator.push_dir(path.as_ref(), create)?;
        }
        Ok(locator)
    }

    /// Append another template directory, searched after the existing ones
    pub fn add_path<P: AsRef<Path>>(&mut self, path: P) -> Result<&mut Self> {
        self.push_dir(path.as_ref(), false)?;
        Ok(self)
    }

    /// Adopt the extension and subdirectory conventions from an engine config
    pub fn with_conventions(mut self, config: &EngineConfig) -> Self {
        self.extension = config.extension().to_string();
        self.layout_dir = config.layout_dir().to_string();
        self.component_dir = config.component_dir().to_string();
        self
    }

    /// Directories in search order
    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn push_dir(&mut self, path: &Path, create: bool) -> Result<()> {
        let full = self.root.join(path);
        if !full.is_dir() {
            if !create {
                return Err(Error::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Template path {} is not a directory", full.display()),
                )));
            }
            std::fs::create_dir_all(&full)?;
            tracing::debug!(path = %full.display(), "created template directory");
        }
        self.dirs.push(full);
        Ok(())
    }

    fn file_name(&self, name: &str) -> String {
        let suffix = format!(".{}", self.extension);
        if name.ends_with(&suffix) {
            name.to_string()
        } else {
            format!("{}{}", name, suffix)
        }
    }

    fn candidates(&self, dir: &Path, file: &str, kind: TemplateKind) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(2);
        match kind {
            TemplateKind::Layout => candidates.push(dir.join(&self.layout_dir).join(file)),
            TemplateKind::Component => candidates.push(dir.join(&self.component_dir).join(file)),
            TemplateKind::Template => {}
        }
        candidates.push(dir.join(file));
        candidates
    }
}

impl TemplateLocator for FileSystemLocator {
    fn resolve(&self, name: &str, kind: TemplateKind) -> Result<PathBuf> {
        let file = self.file_name(name);
        for dir in &self.dirs {
            for candidate in self.candidates(dir, &file, kind) {
                if candidate.is_file() {
                    tracing::trace!(%kind, name, path = %candidate.display(), "resolved template");
                    return Ok(candidate);
                }
            }
        }

        Err(Error::NotFound {
            kind,
            name: file,
            searched: self.dirs.clone(),
        })
    }
}
