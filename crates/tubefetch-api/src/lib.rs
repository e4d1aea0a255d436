//! Axum HTTP API server.
//!
//! This crate provides:
//! - Link submission and simulated video lookup per session
//! - Gemini-backed insights with a fixed fallback
//! - Simulated download lifecycle control and a WebSocket event stream
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod form;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::{InsightService, SessionService};
pub use state::AppState;
