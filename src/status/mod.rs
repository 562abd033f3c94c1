//! Diagnostic snapshot of a running execution engine

mod engine;
mod report;

pub use engine::{
    EngineCounters, EngineStatus, ScraperCounters, SlotCounters, SpiderCounters, StatusError,
    StatusResult,
};
pub use report::{
    format_engine_status, get_engine_status, get_engine_status_at, print_engine_status,
    StatusCheck,
};
