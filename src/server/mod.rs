//! Web server module for the structure synchronization service.
//!
//! This module contains the Axum web server that exposes the relay over a
//! WebSocket endpoint.

pub mod routes;
pub mod websocket;

// Re-export main server functionality
pub use routes::*;
