//! Signal module: routing identities for the dispatch bus
//!
//! # Components
//!
//! - `Signal`: opaque event category, with the `Signal::ANY` wildcard
//! - `Sender`: origin of a firing, with `Anonymous` default and `Any` wildcard
//! - `catalog`: the crawl engine's well-known lifecycle signals

pub mod catalog;
mod identity;

// Re-export main types
pub use identity::{Sender, SenderId, Signal};
