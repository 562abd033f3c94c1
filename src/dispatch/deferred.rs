//! Asynchronous fan-out
//!
//! Both modes invoke every live receiver up front, normalize each response to
//! a future and drive those futures cooperatively on the caller's task:
//!
//! ```text
//! send_catch_log_deferred          send_deferred
//!   invoke all receivers             invoke all receivers
//!   join_all(futures)                first ready failure? -> Err(original)
//!   failure -> log + Outcome         FuturesUnordered
//!   Vec<(receiver, outcome)>           first failure -> Err(original),
//!                                      rest handed to the runtime, discarded
//!                                    Vec<(receiver, value)>
//! ```

use crate::dispatch::log_failure;
use crate::dispatch::outcome::{AggregateResult, Failure, Outcome};
use crate::registry::{
    Arguments, DontLog, NamedArgs, Receiver, ReceiverResult, Registry, Response,
};
use crate::signal::{Sender, Signal};
use futures::future::{join_all, BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;

type Tagged = BoxFuture<'static, (usize, ReceiverResult)>;

/// Fires a signal and waits for every receiver, catching and logging errors
///
/// Receivers may return immediate results or pending futures. The returned
/// future completes once every receiver has completed; one failing receiver
/// never cuts the others short. Failures not in `dont_log` are logged exactly
/// once, then captured as [`Outcome::Failure`].
///
/// Dropping the returned future before it completes drops every in-flight
/// receiver future with it; nothing is logged or recorded afterwards.
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
/// regardless of completion order
pub async fn send_catch_log_deferred(
    registry: &Registry,
    signal: Signal,
    sender: Sender,
    named: NamedArgs,
    dont_log: &DontLog,
) -> AggregateResult {
    let receivers = registry.live_receivers(signal, sender.clone());
    let arguments = Arguments::new(signal, sender, named);

    let pending: Vec<_> = receivers
        .iter()
        .map(|receiver| {
            let future = receiver.invoke(&arguments).into_future();
            let arguments = &arguments;
            async move {
                match future.await {
                    Ok(value) => Outcome::Value(value),
                    Err(error) => {
                        let failure = Failure::capture(receiver, error);
                        if !dont_log.contains(failure.kind()) {
                            log_failure(&failure, arguments);
                        }
                        Outcome::Failure(failure)
                    }
                }
            }
        })
        .collect();

    let outcomes = join_all(pending).await;

    tracing::debug!(
        signal = %signal,
        receivers = outcomes.len(),
        "Signal dispatched, all handlers completed"
    );
    receivers.into_iter().zip(outcomes).collect()
}

/// Fires a signal and waits for every receiver, failing on the first error
///
/// Completes with the original [`Failure`] of the first receiver to fail, as
/// soon as it fails. Receivers still running at that point are left to finish
/// on the ambient tokio runtime and their results are discarded without being
/// logged. Nothing is logged for the propagated failure either; reporting it
/// is up to the caller.
///
/// When several receivers fail during the call itself, the first in
/// resolution order wins.
///
/// # Returns
///
/// * `Ok(Vec<(Receiver, Value)>)` - Every receiver succeeded, in resolution order
/// * `Err(Failure)` - The first failure, unwrapped. Receivers still in flight
///   keep running only when called from within a tokio runtime; otherwise
///   (e.g. under `futures::executor::block_on`) they are dropped unfinished.
pub async fn send_deferred(
    registry: &Registry,
    signal: Signal,
    sender: Sender,
    named: NamedArgs,
) -> Result<Vec<(Receiver, Value)>, Failure> {
    let receivers = registry.live_receivers(signal, sender.clone());
    let arguments = Arguments::new(signal, sender, named);

    let mut values: Vec<Option<Value>> = vec![None; receivers.len()];
    let mut in_flight: FuturesUnordered<Tagged> = FuturesUnordered::new();
    let mut first_failure = None;

    for (index, receiver) in receivers.iter().enumerate() {
        match receiver.invoke(&arguments) {
            Response::Ready(Ok(value)) => values[index] = Some(value),
            Response::Ready(Err(error)) => {
                if first_failure.is_none() {
                    first_failure = Some(Failure::capture(receiver, error));
                }
            }
            pending @ Response::Pending(_) => {
                in_flight.push(
                    pending
                        .into_future()
                        .map(move |result| (index, result))
                        .boxed(),
                );
            }
        }
    }

    if let Some(failure) = first_failure {
        abandon(in_flight);
        return Err(failure);
    }

    while let Some((index, result)) = in_flight.next().await {
        match result {
            Ok(value) => values[index] = Some(value),
            Err(error) => {
                let failure = Failure::capture(&receivers[index], error);
                abandon(in_flight);
                return Err(failure);
            }
        }
    }

    Ok(receivers
        .into_iter()
        .zip(values)
        .filter_map(|(receiver, value)| value.map(|value| (receiver, value)))
        .collect())
}

/// Lets receivers still in flight run to completion, discarding their results
fn abandon(in_flight: FuturesUnordered<Tagged>) {
    if in_flight.is_empty() {
        return;
    }

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(in_flight.for_each(|_| async {}));
        }
        Err(_) => {
            tracing::debug!(
                abandoned = in_flight.len(),
                "No runtime to finish abandoned signal handlers, dropping them"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{named, ErrorKind, ReceiverError};
    use crate::testing::CapturedLogs;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn ok_handler() -> Receiver {
        Receiver::builder("ok_handler")
            .params(["arg"])
            .deferred(|args| {
                let arg = args.get_str("arg").map(str::to_string);
                async move {
                    tokio::task::yield_now().await;
                    assert_eq!(arg.as_deref(), Some("test"));
                    Ok(json!("OK"))
                }
            })
    }

    fn error_handler() -> Receiver {
        Receiver::builder("error_handler").params(["arg"]).sync(|_| {
            Err(ReceiverError::custom(
                "ZeroDivision",
                anyhow::anyhow!("division by zero"),
            ))
        })
    }

    #[tokio::test]
    async fn test_send_catch_log_deferred() {
        let registry = Registry::new();
        let signal = Signal::new("test_signal");
        let error = error_handler();
        let ok = ok_handler();
        registry.connect(&error, signal, Sender::Any);
        registry.connect(&ok, signal, Sender::Any);

        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let result = send_catch_log_deferred(
            &registry,
            signal,
            Sender::Anonymous,
            named([("arg", json!("test"))]),
            &DontLog::none(),
        )
        .await;

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].0, error);
        assert!(result[0].1.is_failure());
        assert_eq!(result[1].0, ok);
        assert_eq!(result[1].1.value(), Some(&json!("OK")));

        let records = logs.errors();
        assert_eq!(records.len(), 1);
        assert!(records[0].message.contains("error_handler"));
    }

    #[tokio::test]
    async fn test_collect_all_preserves_resolution_order() {
        let registry = Registry::new();
        let signal = Signal::new("ordered");
        let slow = Receiver::deferred("slow", |_| async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(json!("slow"))
        });
        let fast = Receiver::sync("fast", |_| Ok(json!("fast")));
        registry.connect(&slow, signal, Sender::Any);
        registry.connect(&fast, signal, Sender::Any);

        let result = send_catch_log_deferred(
            &registry,
            signal,
            Sender::Anonymous,
            NamedArgs::new(),
            &DontLog::none(),
        )
        .await;

        let values: Vec<_> = result.iter().map(|(_, o)| o.value().cloned()).collect();
        assert_eq!(values, vec![Some(json!("slow")), Some(json!("fast"))]);
    }

    #[tokio::test]
    async fn test_collect_all_suppresses_stop_download() {
        let registry = Registry::new();
        let signal = Signal::new("bytes_received");
        let stopper = Receiver::deferred("stopper", |_| async {
            Err(ReceiverError::StopDownload { fail: true })
        });
        registry.connect(&stopper, signal, Sender::Any);

        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let result = send_catch_log_deferred(
            &registry,
            signal,
            Sender::Anonymous,
            NamedArgs::new(),
            &DontLog::none(),
        )
        .await;

        assert_eq!(
            result[0].1.failure().map(Failure::kind),
            Some(ErrorKind::StopDownload)
        );
        assert!(logs.errors().is_empty());
    }

    #[tokio::test]
    async fn test_collect_all_cancellation_records_nothing() {
        let registry = Registry::new();
        let signal = Signal::new("cancelled");
        let hanging = Receiver::deferred("hanging", |_| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err(ReceiverError::from(anyhow::anyhow!("too late")))
        });
        registry.connect(&hanging, signal, Sender::Any);

        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let dont_log = DontLog::none();
        let dispatch = send_catch_log_deferred(
            &registry,
            signal,
            Sender::Anonymous,
            NamedArgs::new(),
            &dont_log,
        );
        let timed_out = tokio::time::timeout(Duration::from_millis(5), dispatch).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(logs.errors().is_empty());
    }

    #[tokio::test]
    async fn test_send_deferred_success() {
        let registry = Registry::new();
        let signal = Signal::new("test_ok_signal");
        let ok = ok_handler();
        registry.connect(&ok, signal, Sender::Any);

        let result = send_deferred(
            &registry,
            signal,
            Sender::Anonymous,
            named([("arg", json!("test"))]),
        )
        .await
        .unwrap();

        assert_eq!(result, vec![(ok, json!("OK"))]);
    }

    #[tokio::test]
    async fn test_send_deferred_surfaces_original_error() {
        let registry = Registry::new();
        let signal = Signal::new("test_error_signal");
        let error = error_handler();
        registry.connect(&error, signal, Sender::Any);

        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let failure = send_deferred(
            &registry,
            signal,
            Sender::Anonymous,
            named([("arg", json!("test"))]),
        )
        .await
        .unwrap_err();

        assert_eq!(failure.receiver(), "error_handler");
        assert_eq!(failure.kind(), ErrorKind::Custom("ZeroDivision"));
        assert!(logs.errors().is_empty());
    }

    #[tokio::test]
    async fn test_send_deferred_abandoned_receivers_keep_running() {
        let registry = Registry::new();
        let signal = Signal::new("abandon");
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let slow = Receiver::deferred("slow", move |_| {
            let flag = flag.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(Value::Null)
            }
        });
        let failing = Receiver::deferred("failing", |_| async {
            Err(ReceiverError::IgnoreRequest("offsite".into()))
        });
        registry.connect(&slow, signal, Sender::Any);
        registry.connect(&failing, signal, Sender::Any);

        let failure = send_deferred(&registry, signal, Sender::Anonymous, NamedArgs::new())
            .await
            .unwrap_err();
        assert_eq!(failure.kind(), ErrorKind::IgnoreRequest);
        assert!(!finished.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_send_deferred_without_runtime_drops_abandoned() {
        let registry = Registry::new();
        let signal = Signal::new("no_runtime");
        let held = Arc::new(());
        let token = held.clone();

        let stuck = Receiver::deferred("stuck", move |_| {
            let token = token.clone();
            async move {
                futures::future::pending::<()>().await;
                drop(token);
                Ok(Value::Null)
            }
        });
        let failing = Receiver::sync("failing", |_| {
            Err(ReceiverError::CloseSpider("shutdown".into()))
        });
        registry.connect(&stuck, signal, Sender::Any);
        registry.connect(&failing, signal, Sender::Any);

        let failure = futures::executor::block_on(send_deferred(
            &registry,
            signal,
            Sender::Anonymous,
            NamedArgs::new(),
        ))
        .unwrap_err();
        assert_eq!(failure.receiver(), "failing");

        // the in-flight future was dropped along with its captured clone
        assert_eq!(Arc::strong_count(&held), 2);
        drop(stuck);
        assert_eq!(Arc::strong_count(&held), 1);
    }

    #[tokio::test]
    async fn test_send_deferred_first_ready_failure_in_order() {
        let registry = Registry::new();
        let signal = Signal::new("two_failures");
        let first = Receiver::sync("first", |_| Err(ReceiverError::DropItem("a".into())));
        let second = Receiver::sync("second", |_| Err(ReceiverError::DropItem("b".into())));
        registry.connect(&first, signal, Sender::Any);
        registry.connect(&second, signal, Sender::Any);

        let failure = send_deferred(&registry, signal, Sender::Anonymous, NamedArgs::new())
            .await
            .unwrap_err();
        assert_eq!(failure.receiver(), "first");
    }
}
