//! Logging utilities.
//!
//! Centralizes logger initialization. Everything else logs through the `log`
//! facade; `env_logger` is only wired up here.

mod init;

pub use init::{init_logging, LoggingConfig, DEFAULT_FILTER};
