//! Tabula HTTP server: query collections over HTTP

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;

pub use config::{Config, ConfigError};
pub use routes::{router, AppState};
