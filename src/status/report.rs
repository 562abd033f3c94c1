//! Engine status report
//!
//! Evaluates every probe of an [`EngineStatus`] in a fixed order. A failing
//! probe is reported as `"<Kind> (exception)"` and the rest still run.

use crate::status::engine::{EngineStatus, StatusResult};
use chrono::{DateTime, Utc};

/// One evaluated probe: its label and rendered value
pub type StatusCheck = (&'static str, String);

/// Returns a report of the current engine status
///
/// # Arguments
///
/// * `engine` - The engine to probe
///
/// # Returns
///
/// Fourteen `(label, value)` pairs, always in the same order
pub fn get_engine_status(engine: &dyn EngineStatus) -> Vec<StatusCheck> {
    get_engine_status_at(engine, Utc::now())
}

/// Same as [`get_engine_status`], measuring elapsed time against `now`
pub fn get_engine_status_at(engine: &dyn EngineStatus, now: DateTime<Utc>) -> Vec<StatusCheck> {
    let elapsed = engine.start_time().map(|start| {
        let millis = (now - start).num_milliseconds();
        format!("{:.3}", millis as f64 / 1000.0)
    });

    vec![
        check("time()-engine.start_time", elapsed),
        check("len(engine.downloader.active)", engine.downloader_active()),
        check("engine.scraper.is_idle()", engine.scraper_is_idle()),
        check("engine.spider.name", engine.spider_name()),
        check("engine.spider_is_idle()", engine.spider_is_idle()),
        check("engine.slot.closing", engine.slot_closing()),
        check("len(engine.slot.inprogress)", engine.slot_in_progress()),
        check(
            "len(engine.slot.scheduler.dqs or [])",
            engine.scheduler_disk_queue_len(),
        ),
        check(
            "len(engine.slot.scheduler.mqs)",
            engine.scheduler_memory_queue_len(),
        ),
        check("len(engine.scraper.slot.queue)", engine.scraper_queue_len()),
        check("len(engine.scraper.slot.active)", engine.scraper_active_len()),
        check(
            "engine.scraper.slot.active_size",
            engine.scraper_active_size(),
        ),
        check(
            "engine.scraper.slot.itemproc_size",
            engine.scraper_itemproc_size(),
        ),
        check(
            "engine.scraper.slot.needs_backout()",
            engine.scraper_needs_backout(),
        ),
    ]
}

fn check<T: ToString>(label: &'static str, result: StatusResult<T>) -> StatusCheck {
    let value = match result {
        Ok(value) => value.to_string(),
        Err(e) => {
            tracing::trace!(probe = label, error = %e, "Status probe failed");
            format!("{} (exception)", e.kind_name())
        }
    };
    (label, value)
}

/// Formats the engine status report
pub fn format_engine_status(engine: &dyn EngineStatus) -> String {
    render(&get_engine_status(engine))
}

fn render(checks: &[StatusCheck]) -> String {
    let mut s = String::from("Execution engine status\n\n");
    for (label, value) in checks {
        s.push_str(&format!("{:<47} : {}\n", label, value));
    }
    s.push('\n');
    s
}

/// Prints the engine status report to stdout
pub fn print_engine_status(engine: &dyn EngineStatus) {
    println!("{}", format_engine_status(engine));
}
