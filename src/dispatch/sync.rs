//! Synchronous fan-out
//!
//! Invokes every live receiver immediately, one after another, and never waits
//! on work a receiver starts.

use crate::dispatch::outcome::{AggregateResult, Failure, Outcome, PendingResponse};
use crate::dispatch::{log_deferred_misuse, log_failure};
use crate::registry::{Arguments, DontLog, NamedArgs, Registry, Response};
use crate::signal::{Sender, Signal};

/// Fires a signal synchronously, catching and logging receiver errors
///
/// Each live receiver is called in resolution order with the arguments it
/// declared. Receiver failures are captured as [`Outcome::Failure`]; they are
/// logged unless their kind is in `dont_log` (stop-download never is). A
/// receiver returning a pending computation is reported as misuse and its
/// un-awaited future becomes the outcome.
///
/// # Arguments
///
/// * `registry` - Where receivers are looked up
/// * `signal` - The signal being fired
/// * `sender` - The origin of the firing
/// * `named` - Named arguments published with the signal
/// * `dont_log` - Error kinds captured without a log record
///
/// # Returns
///
/// One `(receiver, outcome)` pair per live receiver, in resolution order
pub fn send_catch_log(
    registry: &Registry,
    signal: Signal,
    sender: Sender,
    named: NamedArgs,
    dont_log: &DontLog,
) -> AggregateResult {
    let receivers = registry.live_receivers(signal, sender.clone());
    let arguments = Arguments::new(signal, sender, named);
    let mut responses = Vec::with_capacity(receivers.len());

    for receiver in receivers {
        let outcome = match receiver.invoke(&arguments) {
            Response::Ready(Ok(value)) => Outcome::Value(value),
            Response::Ready(Err(error)) => {
                let failure = Failure::capture(&receiver, error);
                if !dont_log.contains(failure.kind()) {
                    log_failure(&failure, &arguments);
                }
                Outcome::Failure(failure)
            }
            pending @ Response::Pending(_) => {
                log_deferred_misuse(&receiver, &arguments);
                Outcome::Pending(PendingResponse::new(pending.into_future()))
            }
        };
        responses.push((receiver, outcome));
    }

    tracing::debug!(
        signal = %signal,
        receivers = responses.len(),
        "Signal dispatched synchronously"
    );
    responses
}
