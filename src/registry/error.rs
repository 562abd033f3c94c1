//! Receiver error types
//!
//! This module defines the errors a receiver can fail with, the kinds used to
//! decide whether a failure gets logged, and the suppression set itself.

use std::collections::HashSet;
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Errors a receiver invocation can fail with
#[derive(Debug, Error)]
pub enum ReceiverError {
    // ===== Flow control =====
    /// Stop processing the current download; never logged by the dispatcher
    #[error("Download stopped by signal handler (fail={fail})")]
    StopDownload { fail: bool },

    /// Drop the current item
    #[error("Item dropped: {0}")]
    DropItem(String),

    /// Ignore the current request
    #[error("Request ignored: {0}")]
    IgnoreRequest(String),

    /// Ask the engine to close the spider
    #[error("Spider close requested: {0}")]
    CloseSpider(String),

    // ===== Failures =====
    /// A required dispatch argument was not supplied
    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    /// The receiver panicked while running
    #[error("Signal handler panicked: {0}")]
    Panicked(String),

    /// An application error tagged with its own kind name
    #[error("{kind}: {error}")]
    Custom {
        kind: &'static str,
        error: anyhow::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReceiverError {
    /// Creates a custom error with its own kind name
    pub fn custom(kind: &'static str, error: impl Into<anyhow::Error>) -> Self {
        Self::Custom {
            kind,
            error: error.into(),
        }
    }

    /// Returns the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StopDownload { .. } => ErrorKind::StopDownload,
            Self::DropItem(_) => ErrorKind::DropItem,
            Self::IgnoreRequest(_) => ErrorKind::IgnoreRequest,
            Self::CloseSpider(_) => ErrorKind::CloseSpider,
            Self::MissingArgument(_) => ErrorKind::MissingArgument,
            Self::Panicked(_) => ErrorKind::Panicked,
            Self::Custom { kind, .. } => ErrorKind::Custom(*kind),
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Renders the error followed by every error in its source chain
    pub fn chain(&self) -> String {
        let mut rendered = self.to_string();
        let mut source = StdError::source(self);
        if let Self::Custom { error, .. } = self {
            source = error.source();
        }
        while let Some(cause) = source {
            rendered.push_str(": ");
            rendered.push_str(&cause.to_string());
            source = cause.source();
        }
        rendered
    }
}

/// Classification of receiver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StopDownload,
    DropItem,
    IgnoreRequest,
    CloseSpider,
    MissingArgument,
    Panicked,
    Custom(&'static str),
    Other,
}

impl ErrorKind {
    /// Returns the name used in log records and reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::StopDownload => "StopDownload",
            Self::DropItem => "DropItem",
            Self::IgnoreRequest => "IgnoreRequest",
            Self::CloseSpider => "CloseSpider",
            Self::MissingArgument => "MissingArgument",
            Self::Panicked => "Panicked",
            Self::Custom(kind) => *kind,
            Self::Other => "Error",
        }
    }

    /// Parses a kind from its configuration file spelling
    ///
    /// Returns None for unknown names. Custom kinds cannot be configured.
    pub fn from_config_name(name: &str) -> Option<Self> {
        match name {
            "stop-download" => Some(Self::StopDownload),
            "drop-item" => Some(Self::DropItem),
            "ignore-request" => Some(Self::IgnoreRequest),
            "close-spider" => Some(Self::CloseSpider),
            "missing-argument" => Some(Self::MissingArgument),
            "panicked" => Some(Self::Panicked),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error kinds whose failures are captured without being logged
///
/// [`ErrorKind::StopDownload`] is always part of the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DontLog {
    kinds: HashSet<ErrorKind>,
}

impl DontLog {
    /// Creates a set holding only the implicit stop-download kind
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a set from the given kinds
    pub fn from_kinds(kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Adds a kind to the set
    pub fn with(mut self, kind: ErrorKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    /// Returns the union of both sets
    pub fn merged(&self, other: &DontLog) -> Self {
        Self {
            kinds: self.kinds.union(&other.kinds).copied().collect(),
        }
    }

    /// Returns true if failures of this kind must not be logged
    pub fn contains(&self, kind: ErrorKind) -> bool {
        kind == ErrorKind::StopDownload || self.kinds.contains(&kind)
    }
}
