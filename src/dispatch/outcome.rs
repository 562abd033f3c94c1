//! Per-receiver outcomes of a firing

use crate::registry::{ErrorKind, Receiver, ReceiverError, ReceiverResult};
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Ordered `(receiver, outcome)` pairs of one firing
pub type AggregateResult = Vec<(Receiver, Outcome)>;

/// A receiver error captured during dispatch, with its context
///
/// Cheap to clone; clones share the captured error.
#[derive(Clone)]
pub struct Failure {
    receiver: Arc<str>,
    error: Arc<ReceiverError>,
    context: Arc<str>,
}

impl Failure {
    /// Captures an error raised by a receiver
    pub fn capture(receiver: &Receiver, error: ReceiverError) -> Self {
        let context = error.chain();
        Self {
            receiver: Arc::from(receiver.name()),
            error: Arc::new(error),
            context: Arc::from(context),
        }
    }

    /// Returns the name of the receiver that failed
    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    /// Returns the original error
    pub fn error(&self) -> &ReceiverError {
        &self.error
    }

    /// Returns the kind of the original error
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Returns the error with its full cause chain, rendered at capture time
    pub fn context(&self) -> &str {
        &self.context
    }
}

impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Failure")
            .field("receiver", &self.receiver)
            .field("kind", &self.kind())
            .field("error", &self.context)
            .finish()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.receiver, self.context)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

/// A pending computation a receiver returned from a synchronous firing
///
/// Synchronous dispatch never awaits it; the caller may.
pub struct PendingResponse {
    future: BoxFuture<'static, ReceiverResult>,
}

impl PendingResponse {
    pub(crate) fn new(future: BoxFuture<'static, ReceiverResult>) -> Self {
        Self { future }
    }

    /// Returns the un-awaited future
    pub fn into_future(self) -> BoxFuture<'static, ReceiverResult> {
        self.future
    }
}

impl fmt::Debug for PendingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PendingResponse(..)")
    }
}

/// The result of invoking one receiver
#[derive(Debug)]
pub enum Outcome {
    /// The receiver returned a value
    Value(Value),

    /// The receiver failed; the failure is data, not a raised error
    Failure(Failure),

    /// The receiver returned a pending computation to a synchronous firing
    Pending(PendingResponse),
}

impl Outcome {
    /// Returns the value if the receiver succeeded
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the failure if the receiver failed
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failure(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}
