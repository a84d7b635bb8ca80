//! API server implementation
//!
//! Provides the descriptor-update endpoint and status endpoints.

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use server::{ApiServer, AppState};
