//! API handlers for the FCI web API.

pub mod resource;

pub use resource::*;

use crate::Database;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Database handle.
    pub db: Database,
    /// Mount point of the API, used to build self links.
    pub url_prefix: String,
}

impl AppState {
    /// Create a new application state.
    pub fn new(db: Database, url_prefix: impl Into<String>) -> Self {
        Self {
            db,
            url_prefix: url_prefix.into(),
        }
    }
}
