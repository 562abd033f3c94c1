//! Well-known signals fired by the crawl engine and its components
//!
//! These have fixed identities in the reserved id range so every component
//! refers to the same routing key without sharing a handle.

use crate::signal::Signal;

pub const ENGINE_STARTED: Signal = Signal::reserved(1, "engine_started");
pub const ENGINE_STOPPED: Signal = Signal::reserved(2, "engine_stopped");

// ===== Spider lifecycle =====
pub const SPIDER_OPENED: Signal = Signal::reserved(3, "spider_opened");
pub const SPIDER_IDLE: Signal = Signal::reserved(4, "spider_idle");
pub const SPIDER_CLOSED: Signal = Signal::reserved(5, "spider_closed");
pub const SPIDER_ERROR: Signal = Signal::reserved(6, "spider_error");

// ===== Requests =====
pub const REQUEST_SCHEDULED: Signal = Signal::reserved(7, "request_scheduled");
pub const REQUEST_DROPPED: Signal = Signal::reserved(8, "request_dropped");
pub const REQUEST_REACHED_DOWNLOADER: Signal =
    Signal::reserved(9, "request_reached_downloader");
pub const REQUEST_LEFT_DOWNLOADER: Signal = Signal::reserved(10, "request_left_downloader");

// ===== Responses =====
pub const RESPONSE_RECEIVED: Signal = Signal::reserved(11, "response_received");
pub const RESPONSE_DOWNLOADED: Signal = Signal::reserved(12, "response_downloaded");
pub const HEADERS_RECEIVED: Signal = Signal::reserved(13, "headers_received");
pub const BYTES_RECEIVED: Signal = Signal::reserved(14, "bytes_received");

// ===== Items =====
pub const ITEM_SCRAPED: Signal = Signal::reserved(15, "item_scraped");
pub const ITEM_DROPPED: Signal = Signal::reserved(16, "item_dropped");
pub const ITEM_ERROR: Signal = Signal::reserved(17, "item_error");

/// Returns every well-known signal in declaration order
pub fn all() -> Vec<Signal> {
    vec![
        ENGINE_STARTED,
        ENGINE_STOPPED,
        SPIDER_OPENED,
        SPIDER_IDLE,
        SPIDER_CLOSED,
        SPIDER_ERROR,
        REQUEST_SCHEDULED,
        REQUEST_DROPPED,
        REQUEST_REACHED_DOWNLOADER,
        REQUEST_LEFT_DOWNLOADER,
        RESPONSE_RECEIVED,
        RESPONSE_DOWNLOADED,
        HEADERS_RECEIVED,
        BYTES_RECEIVED,
        ITEM_SCRAPED,
        ITEM_DROPPED,
        ITEM_ERROR,
    ]
}

/// Looks up a well-known signal by name
///
/// Returns None if the name is not part of the catalog.
pub fn by_name(name: &str) -> Option<Signal> {
    all().into_iter().find(|signal| signal.name() == name)
}
