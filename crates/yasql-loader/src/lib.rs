//! Playbook loader with import resolution.
//!
//! This crate turns YAML text into a [`Playbook`]: it parses the text into
//! an ordered [`Document`], resolves `imports` against other playbook files,
//! merges the imported values under the current document and finally
//! validates the query list.
//!
//! # Features
//!
//! - Recursive import resolution with cycle detection
//! - Per-session cache of resolved playbooks, keyed by canonical path
//! - Namespaced imports (`as:`)
//! - YAML `<<` merge keys
//!
//! # Example
//!
//! ```ignore
//! use yasql_loader::Loader;
//! use std::path::Path;
//!
//! let playbook = Loader::new().load(Path::new("reports.yaml"))?;
//! for query in playbook.queries() {
//!     println!("{}", query.name());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod import;
mod yaml;

pub use import::ImportSpec;
pub use yaml::{parse_document, YamlError};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use yasql_core::{merge_under, Document, Playbook, PlaybookError};

/// Errors that can occur during loading.
#[derive(Debug, Error)]
pub enum LoadError {
    /// IO error reading a file.
    #[error("failed to read file {path}: {source}")]
    Io {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid YAML.
    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        /// The file with the syntax error.
        path: PathBuf,
        /// The underlying parser error.
        #[source]
        source: serde_yaml::Error,
    },

    /// Valid YAML that does not describe a playbook document.
    #[error("invalid document {path}: {message}")]
    InvalidDocument {
        /// The offending file.
        path: PathBuf,
        /// What was wrong.
        message: String,
    },

    /// Import cycle detected.
    #[error("import cycle detected: {}", .cycle.join(" -> "))]
    ImportCycle {
        /// The chain of playbook paths, ending with the repeated one.
        cycle: Vec<String>,
    },

    /// A requested import key does not exist in the source playbook.
    #[error("key `{key}` not found in imported playbook {path}")]
    ImportKeyNotFound {
        /// The dotted key that was requested.
        key: String,
        /// The playbook it was requested from.
        path: PathBuf,
    },

    /// An `imports` entry is malformed.
    #[error("invalid import in {path}: {message}")]
    InvalidImport {
        /// The importing playbook.
        path: PathBuf,
        /// What was wrong.
        message: String,
    },

    /// The resolved document is not a valid playbook.
    #[error("invalid playbook {path}: {source}")]
    Playbook {
        /// The playbook that failed validation.
        path: PathBuf,
        /// The validation error.
        #[source]
        source: PlaybookError,
    },
}

/// Display name used for playbooks loaded from text.
const TEXT_SOURCE: &str = "<string>";

/// Playbook loader.
///
/// One loader is one resolution session: resolved imports are cached by
/// canonical path for as long as the loader lives.
#[derive(Debug, Default)]
pub struct Loader {
    /// Fully resolved documents, by canonical path.
    cache: HashMap<PathBuf, Document>,
    /// Stack for cycle detection during loading.
    import_stack: Vec<PathBuf>,
    /// Directory that imports of text-loaded playbooks are relative to.
    base_dir: Option<PathBuf>,
}

impl Loader {
    /// Create a new loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory that imports of text-loaded playbooks resolve
    /// against.
    ///
    /// Defaults to the current working directory.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Load a playbook file and all its imports.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] in the following cases:
    ///
    /// - [`LoadError::Io`] - Failed to read the file or an imported file
    /// - [`LoadError::Yaml`] / [`LoadError::InvalidDocument`] - Unparseable text
    /// - [`LoadError::ImportCycle`] - Circular import detected
    /// - [`LoadError::ImportKeyNotFound`] - Imported key missing in its source
    /// - [`LoadError::Playbook`] - Duplicate or missing query names
    pub fn load(&mut self, path: &Path) -> Result<Playbook, LoadError> {
        let canonical = path.canonicalize().map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let document = self.load_resolved(&canonical)?;
        Playbook::from_document(document, Some(canonical.clone())).map_err(|source| {
            LoadError::Playbook {
                path: canonical,
                source,
            }
        })
    }

    /// Load a playbook from YAML text.
    pub fn load_str(&mut self, text: &str) -> Result<Playbook, LoadError> {
        let source_path = PathBuf::from(TEXT_SOURCE);
        let document = parse(text, &source_path)?;
        let base_dir = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(|e| LoadError::Io {
                path: PathBuf::from("."),
                source: e,
            })?,
        };
        let document = self.resolve_imports(document, &source_path, &base_dir)?;
        Playbook::from_document(document, None).map_err(|source| LoadError::Playbook {
            path: source_path,
            source,
        })
    }

    fn load_resolved(&mut self, path: &Path) -> Result<Document, LoadError> {
        // Check for cycles
        let path_buf = path.to_path_buf();
        if self.import_stack.contains(&path_buf) {
            let mut cycle: Vec<String> = self
                .import_stack
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            cycle.push(path.display().to_string());
            return Err(LoadError::ImportCycle { cycle });
        }

        // Check if already resolved
        if let Some(document) = self.cache.get(path) {
            debug!(path = %path.display(), "playbook cache hit");
            return Ok(document.clone());
        }

        debug!(path = %path.display(), "loading playbook");
        let source = fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let document = parse(&source, path)?;

        // Mark as loading
        self.import_stack.push(path_buf.clone());
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let resolved = self.resolve_imports(document, path, base_dir);
        self.import_stack.pop();

        let resolved = resolved?;
        self.cache.insert(path_buf, resolved.clone());
        Ok(resolved)
    }

    /// Merge every import of `document` under it.
    ///
    /// Markers on top-level sections (`queries+`) are resolved here; markers
    /// inside query objects are left for the template pass.
    fn resolve_imports(
        &mut self,
        mut document: Document,
        path: &Path,
        base_dir: &Path,
    ) -> Result<Document, LoadError> {
        let Some(imports) = document.remove("imports") else {
            return Ok(merge_under(&Document::new(), &document));
        };
        let specs = ImportSpec::parse_list(&imports).map_err(|message| LoadError::InvalidImport {
            path: path.to_path_buf(),
            message,
        })?;

        let mut imported = Document::new();
        for spec in specs {
            let full_path = base_dir.join(&spec.from);
            let canonical = full_path.canonicalize().map_err(|e| LoadError::Io {
                path: full_path,
                source: e,
            })?;
            let source = self.load_resolved(&canonical)?;
            for key in &spec.keys {
                let value = source
                    .get_path(key)
                    .map_err(|_| LoadError::ImportKeyNotFound {
                        key: key.clone(),
                        path: canonical.clone(),
                    })?
                    .clone();
                debug!(key, from = %canonical.display(), "importing");
                imported = merge_under(&imported, &spec.layer(key, value));
            }
        }

        Ok(merge_under(&imported, &document))
    }
}

fn parse(text: &str, path: &Path) -> Result<Document, LoadError> {
    parse_document(text).map_err(|e| match e {
        YamlError::Syntax(source) => LoadError::Yaml {
            path: path.to_path_buf(),
            source,
        },
        YamlError::Shape(message) => LoadError::InvalidDocument {
            path: path.to_path_buf(),
            message,
        },
    })
}

/// Load a playbook file.
///
/// This is a convenience function that creates a loader and loads a single file.
pub fn load(path: &Path) -> Result<Playbook, LoadError> {
    Loader::new().load(path)
}

/// Load a playbook from YAML text, resolving imports against the working
/// directory.
pub fn load_str(text: &str) -> Result<Playbook, LoadError> {
    Loader::new().load_str(text)
}
