//! Dispatch module: firing signals at live receivers
//!
//! This module contains the fan-out modes of the bus:
//! - Synchronous catch-and-log (`send_catch_log`)
//! - Asynchronous collect-all catch-and-log (`send_catch_log_deferred`)
//! - Asynchronous fail-fast (`send_deferred`)
//! - Bulk disconnect (`disconnect_all`)
//! - `SignalManager`, which binds all of the above to a default sender

mod deferred;
mod disconnect;
mod manager;
mod outcome;
mod sync;

pub use deferred::{send_catch_log_deferred, send_deferred};
pub use disconnect::disconnect_all;
pub use manager::SignalManager;
pub use outcome::{AggregateResult, Failure, Outcome, PendingResponse};
pub use sync::send_catch_log;

use crate::registry::{Arguments, Receiver};
use serde_json::Value;

/// Emits the record for a receiver failure that is not suppressed
pub(crate) fn log_failure(failure: &Failure, arguments: &Arguments) {
    let spider = arguments.spider().map(spider_label);
    tracing::error!(
        receiver = %failure.receiver(),
        error_kind = %failure.kind(),
        error = %failure.context(),
        signal = %arguments.signal(),
        sender = %arguments.sender(),
        spider = spider.as_deref(),
        "Error caught on signal handler: {}",
        failure.receiver()
    );
}

/// Emits the record for a receiver returning a pending value to a
/// synchronous firing
pub(crate) fn log_deferred_misuse(receiver: &Receiver, arguments: &Arguments) {
    let spider = arguments.spider().map(spider_label);
    tracing::error!(
        receiver = %receiver,
        signal = %arguments.signal(),
        sender = %arguments.sender(),
        spider = spider.as_deref(),
        "Cannot return deferreds from signal handler: {}",
        receiver
    );
}

fn spider_label(spider: &Value) -> String {
    match spider {
        Value::String(name) => name.clone(),
        other => other.to_string(),
    }
}
