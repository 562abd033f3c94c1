//! Registry module: receivers and where they are subscribed
//!
//! # Components
//!
//! - `Receiver`: callable capability with a declared parameter set
//! - `Arguments`: the filtered argument view a receiver is called with
//! - `Response`: immediate result or pending future returned by a receiver
//! - `Registry`: weak `(signal, sender)` -> receivers table
//! - `ReceiverError` / `ErrorKind` / `DontLog`: receiver failure taxonomy

mod error;
mod receiver;
mod store;

// Re-export main types
pub use error::{DontLog, ErrorKind, ReceiverError};
pub use receiver::{
    named, Arguments, NamedArgs, Params, Receiver, ReceiverBuilder, ReceiverResult, Response,
};
pub use store::Registry;
