//! Core of the shelfmark lending catalog.
//!
//! This crate defines the catalog entities (books, authors, editions, book
//! domains, readers, borrowings, loan extensions), their relationship graph
//! and delete policy, the reversible SQLite migration sequence, and the
//! integrity checks every write goes through.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod catalog;
pub mod error;
pub mod hierarchy;
pub mod integrity;
pub mod model;
pub mod schema;

pub use error::{Error, Result};
pub use schema::{Database, DatabaseOptions};
