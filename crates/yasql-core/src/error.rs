//! Error types for documents and playbooks.

use thiserror::Error;

/// Error returned by dotted-path lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// A segment of the path does not exist.
    #[error("path `{path}` not found: no key `{segment}`")]
    NotFound {
        /// The full path that was requested.
        path: String,
        /// The first segment that could not be resolved.
        segment: String,
    },
}

/// Errors raised while building a playbook from a document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybookError {
    /// Two queries share a name.
    #[error("duplicate query names: {}", .names.join(", "))]
    DuplicateName {
        /// Every name that appears more than once.
        names: Vec<String>,
    },

    /// A query object has no `name`.
    #[error("query #{index} in `{section}` has no name")]
    MissingName {
        /// Section the query was declared in (`queries` or `tasks`).
        section: String,
        /// Zero-based position within the section.
        index: usize,
    },

    /// No query with the given name.
    #[error("query not found: {0}")]
    QueryNotFound(String),

    /// The document does not follow the playbook schema.
    #[error("invalid playbook: {0}")]
    Invalid(String),
}
