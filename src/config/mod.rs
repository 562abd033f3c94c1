//! Configuration module for sumi-signals
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sumi_signals::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("signals.toml")).unwrap();
//! println!("Default sender: {}", config.dispatch.sender_name);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, DispatchConfig, LoggingConfig, StatusConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
