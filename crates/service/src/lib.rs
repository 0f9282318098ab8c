//! Node surfaces around the veil core.
//!
//! - Configuration (TOML file, validated before startup)
//! - Database (SQLite engine for the record store)
//! - Transport (node-to-node requests over HTTP)
//! - HTTP handlers (client API, peer endpoint, health checks)
//! - Process wiring (logging, signals, background poller)

pub mod config;
pub mod database;
pub mod http;
pub mod process;
pub mod state;
pub mod transport;

// Re-export key types for convenience
pub use config::{Config, ConfigError, StorageConfig};
pub use database::{DatabaseSetupError, SqliteByteStore};
pub use process::spawn_service;
pub use state::{State as ServiceState, StateSetupError};
pub use transport::HttpTransport;
