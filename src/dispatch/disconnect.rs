//! Bulk disconnect

use crate::registry::Registry;
use crate::signal::{Sender, Signal};

/// Disconnects every live receiver a firing of `(signal, sender)` reaches
///
/// Receivers are resolved exactly as for a firing, wildcards included, then
/// each is removed from the `(signal, sender)` pair only. A receiver that
/// reached the firing through a wildcard registration keeps that
/// registration, as do registrations under any other pair. Calling it again
/// is a no-op.
///
/// Mostly useful for cleaning up after tests and on engine reset.
///
/// # Returns
///
/// The number of registrations removed
pub fn disconnect_all(registry: &Registry, signal: Signal, sender: Sender) -> usize {
    let receivers = registry.live_receivers(signal, sender.clone());
    if receivers.is_empty() {
        return 0;
    }

    let removed = registry.disconnect_many(&receivers, signal, sender);
    tracing::debug!(
        signal = %signal,
        receivers = receivers.len(),
        registrations = removed,
        "Disconnected all signal handlers"
    );
    removed
}
