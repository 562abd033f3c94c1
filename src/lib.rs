//! Sumi-Signals: the signal bus of a crawl engine
//!
//! Engine components announce lifecycle events (engine started, item scraped,
//! spider idle, ...) by firing a [`Signal`] on behalf of a [`Sender`]. Any
//! number of [`Receiver`]s may subscribe to a `(signal, sender)` pair, with
//! [`Signal::ANY`] and [`Sender::Any`] acting as wildcards. A firing invokes
//! every live receiver in registration order and reports one outcome per
//! receiver, logging failures instead of propagating them, unless the
//! fail-fast mode is used.

pub mod config;
pub mod dispatch;
pub mod registry;
pub mod signal;
pub mod status;
pub mod testing;

use thiserror::Error;

/// Main error type for sumi-signals operations
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Status error: {0}")]
    Status(#[from] status::StatusError),

    #[error("Receiver error: {0}")]
    Receiver(#[from] dispatch::Failure),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown error kind in dont-log: {0}")]
    UnknownErrorKind(String),
}

/// Result type alias for sumi-signals operations
pub type Result<T> = std::result::Result<T, SignalError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use dispatch::{
    disconnect_all, send_catch_log, send_catch_log_deferred, send_deferred, AggregateResult,
    Failure, Outcome, SignalManager,
};
pub use registry::{
    named, Arguments, DontLog, ErrorKind, NamedArgs, Receiver, ReceiverError, Registry, Response,
};
pub use signal::{Sender, Signal};
