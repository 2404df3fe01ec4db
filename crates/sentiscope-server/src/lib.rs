//! HTTP service exposing the sentiscope comment sentiment engine.
//!
//! The binary (`sentiscope-server`) loads a [`ServerConfig`], initialises
//! logging, builds a [`SentimentEngine`](sentiscope_engine::SentimentEngine)
//! and serves the routes in [`api`] until SIGINT/SIGTERM.

pub mod api;
pub mod config;
pub mod logging;
pub mod shutdown;

pub use api::{build_router, AppState, DistributionRequest, DistributionResponse};
pub use config::{load_config, ServerConfig};
pub use logging::init_logging;
pub use shutdown::{shutdown_engine, shutdown_signal};
