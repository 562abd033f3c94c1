//! Receiver registry
//!
//! Maps `(signal, sender)` keys to ordered lists of weak receiver handles.
//! Expired handles are filtered out at query time and pruned whenever a key
//! is written.

use crate::registry::receiver::{Receiver, WeakReceiver};
use crate::signal::{Sender, Signal};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

type Key = (Signal, Sender);

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Handle to a receiver registry
///
/// Clones share the same underlying table. Queries return snapshots, so a
/// receiver may connect or disconnect (itself included) while a firing is in
/// progress without affecting that firing.
#[derive(Clone, Default)]
pub struct Registry {
    table: Arc<RwLock<HashMap<Key, Vec<WeakReceiver>>>>,
}

impl Registry {
    /// Creates a new, empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Registers a receiver for a `(signal, sender)` pair
    ///
    /// Registering the same receiver twice for a pair is a no-op and keeps
    /// the original position.
    ///
    /// # Returns
    ///
    /// * `true` - The registration was added
    /// * `false` - The receiver was already registered for this pair
    pub fn connect(&self, receiver: &Receiver, signal: Signal, sender: Sender) -> bool {
        let mut table = self.table.write();
        let entries = table.entry((signal, sender.clone())).or_default();
        entries.retain(|weak| weak.strong_count() > 0);

        if entries.iter().any(|weak| receiver.is_handle_of(weak)) {
            return false;
        }

        entries.push(receiver.downgrade());
        tracing::debug!(
            receiver = %receiver,
            signal = %signal,
            sender = %sender,
            "Connected signal handler"
        );
        true
    }

    /// Removes one registration
    ///
    /// Only the exact `(signal, sender)` pair is touched. Absent registrations
    /// are not an error.
    ///
    /// # Returns
    ///
    /// `true` if a registration was removed
    pub fn disconnect(&self, receiver: &Receiver, signal: Signal, sender: Sender) -> bool {
        let mut table = self.table.write();
        let removed = remove_from_key(&mut table, &(signal, sender.clone()), receiver);

        if removed {
            tracing::debug!(
                receiver = %receiver,
                signal = %signal,
                sender = %sender,
                "Disconnected signal handler"
            );
        }
        removed
    }

    /// Returns the live receivers a firing of `(signal, sender)` reaches
    ///
    /// Keys are consulted in this order: exact pair, any signal for this
    /// sender, this signal for any sender, any signal for any sender.
    /// Within a key receivers keep registration order; a receiver reachable
    /// through several keys is returned once, at its first position.
    pub fn live_receivers(&self, signal: Signal, sender: Sender) -> Vec<Receiver> {
        let table = self.table.read();
        let mut seen = HashSet::new();
        let mut receivers = Vec::new();

        for key in lookup_keys(signal, sender) {
            let Some(entries) = table.get(&key) else {
                continue;
            };

            for weak in entries {
                if let Some(receiver) = Receiver::upgrade(weak) {
                    if seen.insert(receiver.id()) {
                        receivers.push(receiver);
                    }
                }
            }
        }

        receivers
    }

    /// Returns true if a firing of `(signal, sender)` would reach anyone
    pub fn has_receivers(&self, signal: Signal, sender: Sender) -> bool {
        !self.live_receivers(signal, sender).is_empty()
    }

    /// Removes the given receivers from the exact `(signal, sender)` pair
    ///
    /// Wildcard registrations they may also hold are kept.
    ///
    /// # Returns
    ///
    /// The number of registrations removed
    pub(crate) fn disconnect_many(
        &self,
        receivers: &[Receiver],
        signal: Signal,
        sender: Sender,
    ) -> usize {
        let mut table = self.table.write();
        let key = (signal, sender);

        receivers
            .iter()
            .filter(|receiver| remove_from_key(&mut table, &key, receiver))
            .count()
    }

    /// Counts registrations whose receiver is still alive
    pub fn len(&self) -> usize {
        self.table
            .read()
            .values()
            .flatten()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Returns true if there are no live registrations
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops registrations whose receiver has been released
    ///
    /// # Returns
    ///
    /// The number of expired registrations removed
    pub fn prune(&self) -> usize {
        let mut table = self.table.write();
        let mut pruned = 0;

        table.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|weak| weak.strong_count() > 0);
            pruned += before - entries.len();
            !entries.is_empty()
        });

        pruned
    }

    /// Removes every registration
    pub fn clear(&self) {
        self.table.write().clear();
    }
}

/// Keys consulted for a lookup, in priority order and without duplicates
fn lookup_keys(signal: Signal, sender: Sender) -> Vec<Key> {
    let candidates = [
        (signal, sender.clone()),
        (Signal::ANY, sender),
        (signal, Sender::Any),
        (Signal::ANY, Sender::Any),
    ];

    let mut keys: Vec<Key> = Vec::with_capacity(candidates.len());
    for key in candidates {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Removes a receiver from one key, dropping the key once it is empty
fn remove_from_key(
    table: &mut HashMap<Key, Vec<WeakReceiver>>,
    key: &Key,
    receiver: &Receiver,
) -> bool {
    let Some(entries) = table.get_mut(key) else {
        return false;
    };

    let removed = entries.iter().any(|weak| receiver.is_handle_of(weak));
    entries.retain(|weak| !receiver.is_handle_of(weak) && weak.strong_count() > 0);

    if entries.is_empty() {
        table.remove(key);
    }
    removed
}
