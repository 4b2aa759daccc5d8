//! Logging setup.
//!
//! The engine only emits through the `log` facade; `init_logging` wires
//! `env_logger` for binaries that want the default backend.

mod init;

pub use init::{init_logging, LoggingConfig};
