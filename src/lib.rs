//! # cinspect
//!
//! Finds the C source behind the built-in functions, methods, types and
//! modules of an interpreter by indexing its C sources ahead of time.
//!
//! ## Architecture
//!
//! - **syntax**: tree-sitter C front end lowered into an owned cursor tree
//! - **visitor**: recognizes functions, method tables, type objects and module registrations
//! - **extract**: turns recognized cursors into index records
//! - **store**: JSON index persistence
//! - **scan**: C source discovery below a directory
//! - **indexer**: hash-gated incremental indexing
//! - **locator**: byte-range source retrieval and decoding
//! - **object**: runtime object classification
//! - **reader**: index lookups for classified objects
//! - **inspect**: `getsource` / `getfile` for embedding hosts
//! - **download**: prebuilt index installation

pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod extract;
pub mod indexer;
pub mod inspect;
pub mod locator;
pub mod object;
pub mod reader;
pub mod scan;
pub mod store;
pub mod syntax;
pub mod visitor;

pub use error::{CinspectError, Result};
pub use inspect::{getfile, getsource};
