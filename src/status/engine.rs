//! Engine status probes and error types
//!
//! This module defines the trait a running engine implements so its state can
//! be snapshotted, and a plain counters struct implementing it.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while probing an engine attribute
#[derive(Debug, Clone, Error)]
pub enum StatusError {
    #[error("Attribute not available: {0}")]
    Unavailable(&'static str),

    #[error("{0}")]
    Other(String),
}

impl StatusError {
    /// Kind name shown in the status report in place of the value
    pub fn kind_name(&self) -> &'static str {
        match self {
            StatusError::Unavailable(_) => "Unavailable",
            StatusError::Other(_) => "Error",
        }
    }
}

/// Result type for status probes
pub type StatusResult<T> = Result<T, StatusError>;

/// Readable attributes of a running execution engine
///
/// Every probe may fail independently, e.g. spider attributes are not
/// available before a spider is opened.
pub trait EngineStatus {
    // ===== Engine =====

    /// When the engine was started
    fn start_time(&self) -> StatusResult<DateTime<Utc>>;

    /// Whether the open spider has nothing left to do
    fn spider_is_idle(&self) -> StatusResult<bool>;

    // ===== Downloader =====

    /// Number of requests the downloader is currently processing
    fn downloader_active(&self) -> StatusResult<usize>;

    // ===== Spider =====

    /// Name of the open spider
    fn spider_name(&self) -> StatusResult<String>;

    // ===== Slot / Scheduler =====

    /// Whether the engine slot is closing
    fn slot_closing(&self) -> StatusResult<bool>;

    /// Number of requests in progress in the engine slot
    fn slot_in_progress(&self) -> StatusResult<usize>;

    /// Length of the scheduler's disk queue, 0 when there is none
    fn scheduler_disk_queue_len(&self) -> StatusResult<usize>;

    /// Length of the scheduler's memory queue
    fn scheduler_memory_queue_len(&self) -> StatusResult<usize>;

    // ===== Scraper =====

    /// Whether the scraper has no queued or active responses
    fn scraper_is_idle(&self) -> StatusResult<bool>;

    /// Number of responses waiting to be scraped
    fn scraper_queue_len(&self) -> StatusResult<usize>;

    /// Number of responses being scraped
    fn scraper_active_len(&self) -> StatusResult<usize>;

    /// Total size in bytes of the responses being scraped
    fn scraper_active_size(&self) -> StatusResult<usize>;

    /// Number of items being processed by the item pipeline
    fn scraper_itemproc_size(&self) -> StatusResult<usize>;

    /// Whether the scraper wants the engine to stop feeding it responses
    fn scraper_needs_backout(&self) -> StatusResult<bool>;
}

/// Spider attributes of a counters snapshot
#[derive(Debug, Clone, Default)]
pub struct SpiderCounters {
    pub name: String,
}

/// Engine slot attributes of a counters snapshot
#[derive(Debug, Clone, Default)]
pub struct SlotCounters {
    pub closing: bool,
    pub in_progress: usize,

    /// `None` when the scheduler runs without a disk queue
    pub disk_queue: Option<usize>,
    pub memory_queue: usize,
}

/// Scraper attributes of a counters snapshot
#[derive(Debug, Clone)]
pub struct ScraperCounters {
    pub queue: usize,
    pub active: usize,
    pub active_size: usize,
    pub itemproc_size: usize,

    /// Active size above which the scraper asks for backout
    pub max_active_size: usize,
}

impl Default for ScraperCounters {
    fn default() -> Self {
        Self {
            queue: 0,
            active: 0,
            active_size: 0,
            itemproc_size: 0,
            max_active_size: 5_000_000,
        }
    }
}

/// Plain engine state, filled in by whoever tracks the engine
#[derive(Debug, Clone, Default)]
pub struct EngineCounters {
    pub start_time: Option<DateTime<Utc>>,
    pub downloader_active: usize,
    pub spider: Option<SpiderCounters>,
    pub slot: Option<SlotCounters>,
    pub scraper: ScraperCounters,
}

impl EngineCounters {
    /// Creates counters for an engine started now
    pub fn started() -> Self {
        Self {
            start_time: Some(Utc::now()),
            ..Self::default()
        }
    }

    fn slot(&self) -> StatusResult<&SlotCounters> {
        self.slot.as_ref().ok_or(StatusError::Unavailable("engine.slot"))
    }

    fn spider(&self) -> StatusResult<&SpiderCounters> {
        self.spider
            .as_ref()
            .ok_or(StatusError::Unavailable("engine.spider"))
    }
}

impl EngineStatus for EngineCounters {
    fn start_time(&self) -> StatusResult<DateTime<Utc>> {
        self.start_time
            .ok_or(StatusError::Unavailable("engine.start_time"))
    }

    fn spider_is_idle(&self) -> StatusResult<bool> {
        self.spider()?;
        let slot = self.slot()?;
        Ok(self.scraper_is_idle()?
            && self.downloader_active == 0
            && slot.in_progress == 0
            && slot.memory_queue == 0
            && slot.disk_queue.unwrap_or(0) == 0)
    }

    fn downloader_active(&self) -> StatusResult<usize> {
        Ok(self.downloader_active)
    }

    fn spider_name(&self) -> StatusResult<String> {
        Ok(self.spider()?.name.clone())
    }

    fn slot_closing(&self) -> StatusResult<bool> {
        Ok(self.slot()?.closing)
    }

    fn slot_in_progress(&self) -> StatusResult<usize> {
        Ok(self.slot()?.in_progress)
    }

    fn scheduler_disk_queue_len(&self) -> StatusResult<usize> {
        Ok(self.slot()?.disk_queue.unwrap_or(0))
    }

    fn scheduler_memory_queue_len(&self) -> StatusResult<usize> {
        Ok(self.slot()?.memory_queue)
    }

    fn scraper_is_idle(&self) -> StatusResult<bool> {
        Ok(self.scraper.queue == 0 && self.scraper.active == 0)
    }

    fn scraper_queue_len(&self) -> StatusResult<usize> {
        Ok(self.scraper.queue)
    }

    fn scraper_active_len(&self) -> StatusResult<usize> {
        Ok(self.scraper.active)
    }

    fn scraper_active_size(&self) -> StatusResult<usize> {
        Ok(self.scraper.active_size)
    }

    fn scraper_itemproc_size(&self) -> StatusResult<usize> {
        Ok(self.scraper.itemproc_size)
    }

    fn scraper_needs_backout(&self) -> StatusResult<bool> {
        Ok(self.scraper.active_size > self.scraper.max_active_size)
    }
}
