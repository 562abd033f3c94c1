//! Integration tests for the signal bus
//!
//! These tests drive the public dispatch API end to end: registration,
//! every firing mode, log capture and disconnects.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sumi_signals::signal::catalog;
use sumi_signals::testing::{capture_logs, CapturedLogs};
use sumi_signals::{
    disconnect_all, named, send_catch_log, send_catch_log_deferred, send_deferred, DontLog,
    ErrorKind, NamedArgs, Receiver, ReceiverError, Registry, Sender, Signal, SignalManager,
};

/// Creates a receiver returning its index
fn numbered(index: usize) -> Receiver {
    Receiver::sync(format!("receiver-{}", index), move |_| Ok(json!(index)))
}

fn stop_download(name: &str) -> Receiver {
    Receiver::sync(name.to_string(), |_| {
        Err(ReceiverError::StopDownload { fail: true })
    })
}

#[tokio::test]
async fn test_every_receiver_reported_in_registration_order() {
    let registry = Registry::new();
    let signal = Signal::new("ordered");
    let sender = Sender::new("engine");
    let receivers: Vec<Receiver> = (0..5).map(numbered).collect();
    for receiver in &receivers {
        registry.connect(receiver, signal, sender.clone());
    }

    let sync_result = send_catch_log(
        &registry,
        signal,
        sender.clone(),
        NamedArgs::new(),
        &DontLog::none(),
    );
    let deferred_result = send_catch_log_deferred(
        &registry,
        signal,
        sender.clone(),
        NamedArgs::new(),
        &DontLog::none(),
    )
    .await;
    let fail_fast = send_deferred(&registry, signal, sender, NamedArgs::new())
        .await
        .unwrap();

    assert_eq!(sync_result.len(), 5);
    assert_eq!(deferred_result.len(), 5);
    assert_eq!(fail_fast.len(), 5);
    for (index, receiver) in receivers.iter().enumerate() {
        assert_eq!(&sync_result[index].0, receiver);
        assert_eq!(sync_result[index].1.value(), Some(&json!(index)));
        assert_eq!(&deferred_result[index].0, receiver);
        assert_eq!(deferred_result[index].1.value(), Some(&json!(index)));
        assert_eq!(fail_fast[index].1, json!(index));
    }
}

#[tokio::test]
async fn test_stop_download_is_never_logged() {
    let registry = Registry::new();
    let signal = catalog::HEADERS_RECEIVED;
    let sender = Sender::new("downloader");
    let stopper = stop_download("stopper");
    registry.connect(&stopper, signal, sender.clone());

    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let result = send_catch_log(
        &registry,
        signal,
        sender.clone(),
        NamedArgs::new(),
        &DontLog::none(),
    );
    assert!(result[0].1.is_failure());
    assert_eq!(
        result[0].1.failure().map(|f| f.kind()),
        Some(ErrorKind::StopDownload)
    );

    let result = send_catch_log_deferred(
        &registry,
        signal,
        sender.clone(),
        NamedArgs::new(),
        &DontLog::none(),
    )
    .await;
    assert!(result[0].1.is_failure());

    let failure = send_deferred(&registry, signal, sender, NamedArgs::new())
        .await
        .unwrap_err();
    assert!(matches!(
        failure.error(),
        ReceiverError::StopDownload { fail: true }
    ));

    assert!(logs.errors().is_empty());
}

#[tokio::test]
async fn test_other_errors_logged_exactly_once() {
    let registry = Registry::new();
    let signal = catalog::ITEM_SCRAPED;
    let sender = Sender::new("scraper");
    let ok = numbered(0);
    let broken = Receiver::sync("broken_pipeline", |_| {
        Err(anyhow::anyhow!("database unavailable").into())
    });
    registry.connect(&ok, signal, sender.clone());
    registry.connect(&broken, signal, sender.clone());

    let logs = CapturedLogs::default();
    let result = capture_logs(&logs, || {
        send_catch_log(
            &registry,
            signal,
            sender.clone(),
            named([("spider", json!("books"))]),
            &DontLog::none(),
        )
    });
    assert!(result[0].1.is_value());
    assert!(result[1].1.is_failure());

    let errors = logs.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("receiver"), Some("broken_pipeline"));
    assert_eq!(errors[0].field("spider"), Some("books"));
    assert!(errors[0].message.contains("broken_pipeline"));
    assert!(errors[0]
        .field("error")
        .is_some_and(|e| e.contains("database unavailable")));

    let logs = CapturedLogs::default();
    let _guard = logs.install();
    let result = send_catch_log_deferred(
        &registry,
        signal,
        sender,
        NamedArgs::new(),
        &DontLog::none(),
    )
    .await;
    assert!(result[1].1.is_failure());
    assert_eq!(logs.errors().len(), 1);
    assert_eq!(logs.errors()[0].field("receiver"), Some("broken_pipeline"));
}

#[test]
fn test_disconnect_all_then_nothing_fires() {
    let registry = Registry::new();
    let signal = catalog::SPIDER_CLOSED;
    let sender = Sender::new("engine");
    let receivers: Vec<Receiver> = (0..3).map(numbered).collect();
    for receiver in &receivers {
        registry.connect(receiver, signal, sender.clone());
    }

    assert_eq!(disconnect_all(&registry, signal, sender.clone()), 3);

    let result = send_catch_log(
        &registry,
        signal,
        sender,
        NamedArgs::new(),
        &DontLog::none(),
    );
    assert!(result.is_empty());
}

#[test]
fn test_disconnect_all_keeps_global_listener() {
    let registry = Registry::new();
    let engine = Sender::new("engine");
    let closer = numbered(0);
    let stats = numbered(1);
    registry.connect(&closer, catalog::SPIDER_CLOSED, engine.clone());
    registry.connect(&stats, Signal::ANY, Sender::Any);

    disconnect_all(&registry, catalog::SPIDER_CLOSED, engine.clone());

    let result = send_catch_log(
        &registry,
        catalog::ITEM_SCRAPED,
        engine.clone(),
        NamedArgs::new(),
        &DontLog::none(),
    );
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].0, stats);

    let result = send_catch_log(
        &registry,
        catalog::SPIDER_CLOSED,
        engine,
        NamedArgs::new(),
        &DontLog::none(),
    );
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].0, stats);
}

#[tokio::test]
async fn test_collect_all_waits_for_slow_failure() {
    let registry = Registry::new();
    let signal = Signal::new("slow_failure");
    let sender = Sender::new("engine");
    let slow = Receiver::deferred("slow", |_| async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Err(ReceiverError::IgnoreRequest("too late".into()))
    });
    let fast = Receiver::sync("fast", |_| Ok(json!("done")));
    registry.connect(&slow, signal, sender.clone());
    registry.connect(&fast, signal, sender.clone());

    let logs = CapturedLogs::default();
    let _guard = logs.install();
    let started = Instant::now();
    let result = send_catch_log_deferred(
        &registry,
        signal,
        sender,
        NamedArgs::new(),
        &DontLog::none(),
    )
    .await;

    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].0, slow);
    assert_eq!(
        result[0].1.failure().map(|f| f.kind()),
        Some(ErrorKind::IgnoreRequest)
    );
    assert_eq!(result[1].0, fast);
    assert_eq!(result[1].1.value(), Some(&json!("done")));
    assert_eq!(logs.errors().len(), 1);
}

#[tokio::test]
async fn test_fail_fast_returns_first_error_without_waiting() {
    let registry = Registry::new();
    let signal = catalog::SPIDER_IDLE;
    let sender = Sender::new("engine");
    let failing = Receiver::sync("failing", |_| {
        Err(ReceiverError::CloseSpider("no more work".into()))
    });
    let slow = Receiver::deferred("slow", |_| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(json!("late"))
    });
    registry.connect(&failing, signal, sender.clone());
    registry.connect(&slow, signal, sender.clone());

    let logs = CapturedLogs::default();
    let _guard = logs.install();
    let started = Instant::now();
    let failure = send_deferred(&registry, signal, sender, NamedArgs::new())
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(failure.receiver(), "failing");
    match failure.error() {
        ReceiverError::CloseSpider(reason) => assert_eq!(reason, "no more work"),
        other => panic!("unexpected error: {:?}", other),
    }
    // fail-fast propagates instead of logging
    assert!(logs.errors().is_empty());
}

#[test]
fn test_self_disconnect_during_firing() {
    let registry = Registry::new();
    let signal = Signal::new("self_disconnect");
    let sender = Sender::new("engine");
    let calls = Arc::new(Mutex::new(Vec::new()));

    let first = {
        let calls = Arc::clone(&calls);
        Receiver::sync("first", move |_| {
            calls.lock().push("first");
            Ok(Value::Null)
        })
    };

    let slot: Arc<Mutex<Option<Receiver>>> = Arc::new(Mutex::new(None));
    let once = {
        let calls = Arc::clone(&calls);
        let slot = Arc::clone(&slot);
        let registry = registry.clone();
        let sender = sender.clone();
        Receiver::sync("once", move |_| {
            calls.lock().push("once");
            if let Some(me) = slot.lock().take() {
                registry.disconnect(&me, signal, sender.clone());
            }
            Ok(Value::Null)
        })
    };
    *slot.lock() = Some(once.clone());

    let last = {
        let calls = Arc::clone(&calls);
        Receiver::sync("last", move |_| {
            calls.lock().push("last");
            Ok(Value::Null)
        })
    };

    registry.connect(&first, signal, sender.clone());
    registry.connect(&once, signal, sender.clone());
    registry.connect(&last, signal, sender.clone());

    let result = send_catch_log(
        &registry,
        signal,
        sender.clone(),
        NamedArgs::new(),
        &DontLog::none(),
    );
    assert_eq!(result.len(), 3);
    assert_eq!(*calls.lock(), vec!["first", "once", "last"]);

    calls.lock().clear();
    let result = send_catch_log(
        &registry,
        signal,
        sender,
        NamedArgs::new(),
        &DontLog::none(),
    );
    assert_eq!(result.len(), 2);
    assert_eq!(*calls.lock(), vec!["first", "last"]);
}

#[test]
fn test_any_sender_receives_every_sender() {
    let registry = Registry::new();
    let signal = catalog::RESPONSE_RECEIVED;
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = {
        let seen = Arc::clone(&seen);
        Receiver::sync("counter", move |args| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(json!(args.sender().to_string()))
        })
    };
    registry.connect(&counter, signal, Sender::Any);

    for sender in [
        Sender::new("downloader"),
        Sender::new("middleware"),
        Sender::Anonymous,
    ] {
        let result = send_catch_log(
            &registry,
            signal,
            sender.clone(),
            NamedArgs::new(),
            &DontLog::none(),
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].1.value(), Some(&json!(sender.to_string())));
    }
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn test_dropped_receiver_stops_receiving() {
    let registry = Registry::new();
    let signal = Signal::new("weak");
    let kept = numbered(0);
    registry.connect(&kept, signal, Sender::Anonymous);
    {
        let temporary = numbered(1);
        registry.connect(&temporary, signal, Sender::Anonymous);
        assert_eq!(registry.live_receivers(signal, Sender::Anonymous).len(), 2);
    }

    let result = send_catch_log(
        &registry,
        signal,
        Sender::Anonymous,
        NamedArgs::new(),
        &DontLog::none(),
    );
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].0, kept);
}

#[tokio::test]
async fn test_manager_lifecycle() {
    let manager = SignalManager::with_registry(Sender::new("engine"), Registry::new())
        .with_dont_log(DontLog::from_kinds([ErrorKind::DropItem]));
    let validator = Receiver::builder("validator")
        .params(["item"])
        .sync(|args| {
            let id = args.require("item")?["id"].as_u64().unwrap_or(0);
            if id % 2 == 0 {
                Err(ReceiverError::DropItem(format!("even id {}", id)))
            } else {
                Ok(json!(id))
            }
        });
    manager.connect(&validator, catalog::ITEM_SCRAPED);

    let logs = CapturedLogs::default();
    let _guard = logs.install();
    let mut dropped = 0;
    for id in 1..=4 {
        let result = manager
            .send_catch_log_deferred(catalog::ITEM_SCRAPED, named([("item", json!({ "id": id }))]))
            .await;
        if result[0].1.is_failure() {
            dropped += 1;
        }
    }
    assert_eq!(dropped, 2);
    assert!(logs.errors().is_empty());

    assert_eq!(manager.disconnect_all(catalog::ITEM_SCRAPED), 1);
    assert!(manager
        .send_catch_log(catalog::ITEM_SCRAPED, NamedArgs::new())
        .is_empty());
}
