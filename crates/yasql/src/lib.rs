//! yasql command-line tool.
//!
//! Compiles the queries of a YAML playbook to SQL and prints them. It never
//! connects to a database.
//!
//! # Example Usage
//!
//! ```bash
//! yasql list reports.yaml
//! yasql render reports.yaml -q paid_orders,top_regions
//! yasql render reports.yaml --format json --now "2018-08-15 10:00:00" --dialect sqlite
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cmd;
pub mod config;
