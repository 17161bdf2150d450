//! Core types for yasql
//!
//! This crate provides the data model shared by the loader and the query
//! compiler:
//!
//! - [`Value`] / [`Document`] - ordered, dotted-path addressable YAML values
//! - [`merge`] - layered override merge with `key+` merge markers
//! - [`Playbook`] / [`Query`] - a loaded bundle of vars, templates and named queries
//!
//! # Example
//!
//! ```
//! use yasql_core::{merge, Document, Value};
//!
//! let base = Document::new().with("select", Document::new().with("from", "orders"));
//! let layer = Document::new().with("select+", Document::new().with("limit", 10));
//!
//! let merged = merge(&[base, layer]);
//! assert_eq!(merged.get_path("select.from").unwrap(), &Value::from("orders"));
//! assert_eq!(merged.get_path("select.limit").unwrap(), &Value::Integer(10));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod merge;
pub mod playbook;
pub mod value;

pub use error::{PathError, PlaybookError};
pub use merge::{merge, merge_into, merge_under, normalize, split_marker, MERGE_MARKER};
pub use playbook::{Playbook, Query, QUERY_SECTIONS};
pub use value::{Document, Value};
