//! FCI - File Collection Index
//!
//! A hierarchical index of named directories and files, addressable by
//! slash-separated paths, with a JSON metadata object per resource, served
//! over an HTTP API.

pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod logging;
pub mod resource;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{FciError, FieldErrors, Result};
