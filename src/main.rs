//! Sumi-Signals main entry point
//!
//! Command-line driver that runs a simulated crawl lifecycle through the
//! signal bus and prints what the receivers saw.

use clap::Parser;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sumi_signals::config::{load_config_with_hash, Config};
use sumi_signals::signal::catalog;
use sumi_signals::status::{print_engine_status, EngineCounters, SlotCounters, SpiderCounters};
use sumi_signals::{named, NamedArgs, Receiver, ReceiverError, Registry, SignalManager};
use tracing_subscriber::EnvFilter;

/// Sumi-Signals: the signal bus of a crawl engine
///
/// Runs a simulated engine lifecycle (engine start, spider open, scraped
/// items, idle check, spider close, engine stop) through the signal
/// manager and reports the outcomes.
#[derive(Parser, Debug)]
#[command(name = "sumi-signals")]
#[command(version = "1.0.0")]
#[command(about = "Signal dispatch bus for a crawl engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// List the engine's well-known signals and exit
    #[arg(long)]
    list_signals: bool,

    /// Number of items to scrape during the simulated run
    #[arg(long, default_value_t = 5)]
    items: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.list_signals {
        handle_list_signals();
        return Ok(());
    }

    // Load and validate configuration
    let (config, config_hash) = match &cli.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)?;
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    // Setup logging based on verbosity
    setup_logging(&config.logging.filter, cli.verbose, cli.quiet);

    match (&cli.config, &config_hash) {
        (Some(path), Some(hash)) => tracing::info!(
            "Configuration loaded from {} (hash: {})",
            path.display(),
            hash
        ),
        _ => tracing::info!("No configuration file given, using defaults"),
    }

    handle_run(&config, cli.items).await.map_err(|e| {
        tracing::error!("Run failed: {}", e);
        e.into()
    })
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(base_filter: &str, verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new(base_filter),
            1 => EnvFilter::new("sumi_signals=debug,info"),
            2 => EnvFilter::new("sumi_signals=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --list-signals: prints the catalog
fn handle_list_signals() {
    println!("=== Well-known Signals ===\n");
    for signal in catalog::all() {
        println!("  {:>3}  {}", signal.id(), signal.name());
    }
}

/// Receivers kept alive for the duration of the run
///
/// The registry holds receivers weakly, so dropping this drops every
/// subscription made by `connect_receivers`.
struct RunReceivers {
    _receivers: Vec<Receiver>,
}

/// Connects the demo receivers: an engine-state tracker, an item validator,
/// an async item exporter, and an idle check
fn connect_receivers(
    manager: &SignalManager,
    engine: &Arc<Mutex<EngineCounters>>,
    exported: &Arc<AtomicUsize>,
) -> RunReceivers {
    let mut receivers = Vec::new();

    // ===== Engine state tracking =====

    let state = Arc::clone(engine);
    let started = Receiver::sync("engine_state.started", move |_| {
        *state.lock() = EngineCounters::started();
        Ok(Value::Null)
    });
    manager.connect(&started, catalog::ENGINE_STARTED);
    receivers.push(started);

    let state = Arc::clone(engine);
    let opened = Receiver::builder("engine_state.spider_opened")
        .params(["spider"])
        .sync(move |args| {
            let name = args.parse::<String>("spider")?;
            let mut engine = state.lock();
            engine.spider = Some(SpiderCounters { name });
            engine.slot = Some(SlotCounters::default());
            Ok(Value::Null)
        });
    manager.connect(&opened, catalog::SPIDER_OPENED);
    receivers.push(opened);

    let state = Arc::clone(engine);
    let closed = Receiver::sync("engine_state.spider_closed", move |args| {
        if let Some(slot) = state.lock().slot.as_mut() {
            slot.closing = true;
        }
        Ok(json!(args.get_str("reason").unwrap_or("finished")))
    });
    manager.connect(&closed, catalog::SPIDER_CLOSED);
    receivers.push(closed);

    // ===== Item pipeline =====

    let validator = Receiver::builder("pipeline.validate")
        .params(["item"])
        .sync(|args| {
            let id = args.require("item")?["id"].as_u64().unwrap_or(0);
            if id % 3 == 0 {
                return Err(ReceiverError::DropItem(format!("item {} has no title", id)));
            }
            Ok(json!({ "valid": id }))
        });
    manager.connect(&validator, catalog::ITEM_SCRAPED);
    receivers.push(validator);

    let count = Arc::clone(exported);
    let state = Arc::clone(engine);
    let exporter = Receiver::builder("pipeline.export")
        .params(["item"])
        .deferred(move |args| {
            let item = args.get("item").cloned().unwrap_or(Value::Null);
            let count = Arc::clone(&count);
            let state = Arc::clone(&state);
            async move {
                state.lock().scraper.itemproc_size += 1;
                tokio::time::sleep(Duration::from_millis(10)).await;
                count.fetch_add(1, Ordering::SeqCst);
                state.lock().scraper.itemproc_size -= 1;
                Ok(json!({ "exported": item }))
            }
        });
    manager.connect(&exporter, catalog::ITEM_SCRAPED);
    receivers.push(exporter);

    // ===== Idle check =====

    let count = Arc::clone(exported);
    let idle = Receiver::sync("spider.idle_check", move |_| {
        Err(ReceiverError::CloseSpider(format!(
            "exported {} items, nothing left to schedule",
            count.load(Ordering::SeqCst)
        )))
    });
    manager.connect(&idle, catalog::SPIDER_IDLE);
    receivers.push(idle);

    RunReceivers {
        _receivers: receivers,
    }
}

/// Handles the main run: fires the engine lifecycle through the manager
async fn handle_run(config: &Config, items: usize) -> sumi_signals::Result<()> {
    let manager = SignalManager::from_config(&config.dispatch, Registry::new())?;
    let engine = Arc::new(Mutex::new(EngineCounters::default()));
    let exported = Arc::new(AtomicUsize::new(0));
    let receivers = connect_receivers(&manager, &engine, &exported);

    tracing::info!(sender = %manager.sender(), "Starting engine");
    manager.send_catch_log(catalog::ENGINE_STARTED, NamedArgs::new());

    let spider = json!("books");
    manager.send_catch_log(
        catalog::SPIDER_OPENED,
        named([("spider", spider.clone())]),
    );

    let mut dropped = 0;
    for id in 1..=items {
        let item = json!({ "id": id, "title": format!("Book {}", id) });
        let result = manager
            .send_catch_log_deferred(
                catalog::ITEM_SCRAPED,
                named([("item", item), ("spider", spider.clone())]),
            )
            .await;
        dropped += result
            .iter()
            .filter(|(_, outcome)| {
                outcome
                    .failure()
                    .map(|f| matches!(f.error(), ReceiverError::DropItem(_)))
                    .unwrap_or(false)
            })
            .count();
    }

    let close_reason = match manager
        .send_deferred(catalog::SPIDER_IDLE, named([("spider", spider.clone())]))
        .await
    {
        Ok(_) => "finished".to_string(),
        Err(failure) => {
            tracing::info!("Idle check asked to close the spider: {}", failure);
            failure.error().to_string()
        }
    };

    manager.send_catch_log(
        catalog::SPIDER_CLOSED,
        named([("spider", spider), ("reason", json!(close_reason))]),
    );
    manager.send_catch_log(catalog::ENGINE_STOPPED, NamedArgs::new());

    println!("\n=== Run Summary ===\n");
    println!("  Items scraped:  {}", items);
    println!("  Items dropped:  {}", dropped);
    println!("  Items exported: {}", exported.load(Ordering::SeqCst));
    println!("  Close reason:   {}", close_reason);
    println!();

    if config.status.report {
        print_engine_status(&*engine.lock());
    }

    drop(receivers);
    Ok(())
}
