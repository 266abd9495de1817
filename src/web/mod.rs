//! Web API module for FCI.
//!
//! Exposes the resource tree as a JSON HTTP API built on axum.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
