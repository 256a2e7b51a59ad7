//! Vigil dashboard server: REST routes, WebSocket sessions and pipeline
//! wiring around `vigil-lib`

pub mod api;
pub mod config;
pub mod pipeline;
pub mod security;
pub mod ws;

pub use api::{create_router, serve, with_middleware, ApiError, AppState};
pub use config::VigilConfig;
pub use pipeline::Pipeline;
