//! Signal manager
//!
//! Engine components rarely call the dispatch functions directly. They hold a
//! `SignalManager`, which binds a registry and a default sender, and merges
//! the configured `dont_log` kinds into every catch-and-log firing.

use crate::config::DispatchConfig;
use crate::dispatch::outcome::{AggregateResult, Failure};
use crate::dispatch::{deferred, disconnect, sync};
use crate::registry::{DontLog, NamedArgs, Receiver, Registry};
use crate::signal::{Sender, Signal};
use crate::ConfigError;
use serde_json::Value;

/// Default-sender façade over a registry
#[derive(Clone)]
pub struct SignalManager {
    sender: Sender,
    registry: Registry,
    dont_log: DontLog,
}

impl SignalManager {
    /// Creates a manager over the process-wide registry
    pub fn new(sender: Sender) -> Self {
        Self::with_registry(sender, Registry::global().clone())
    }

    /// Creates a manager over the given registry
    pub fn with_registry(sender: Sender, registry: Registry) -> Self {
        Self {
            sender,
            registry,
            dont_log: DontLog::none(),
        }
    }

    /// Creates a manager from the dispatch section of the configuration
    ///
    /// The sender gets a fresh identity labelled with the configured name.
    ///
    /// # Returns
    ///
    /// * `Ok(SignalManager)` - Manager with the configured defaults
    /// * `Err(ConfigError)` - An unknown error kind was configured
    pub fn from_config(config: &DispatchConfig, registry: Registry) -> Result<Self, ConfigError> {
        let dont_log = config.dont_log_kinds()?;
        Ok(Self::with_registry(Sender::new(config.sender_name.as_str()), registry)
            .with_dont_log(dont_log))
    }

    /// Sets the kinds never logged by this manager's catch-and-log firings
    pub fn with_dont_log(mut self, dont_log: DontLog) -> Self {
        self.dont_log = dont_log;
        self
    }

    /// Returns the default sender
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Returns the registry this manager dispatches through
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ===== Registration =====

    /// Connects a receiver to a signal from the default sender
    pub fn connect(&self, receiver: &Receiver, signal: Signal) -> bool {
        self.registry.connect(receiver, signal, self.sender.clone())
    }

    /// Connects a receiver to a signal from a specific sender
    pub fn connect_with_sender(&self, receiver: &Receiver, signal: Signal, sender: Sender) -> bool {
        self.registry.connect(receiver, signal, sender)
    }

    /// Disconnects a receiver from a signal of the default sender
    pub fn disconnect(&self, receiver: &Receiver, signal: Signal) -> bool {
        self.registry.disconnect(receiver, signal, self.sender.clone())
    }

    /// Disconnects every receiver reachable for a signal of the default sender
    pub fn disconnect_all(&self, signal: Signal) -> usize {
        disconnect::disconnect_all(&self.registry, signal, self.sender.clone())
    }

    // ===== Firing =====

    /// Fires a signal synchronously; see [`sync::send_catch_log`]
    pub fn send_catch_log(&self, signal: Signal, named: NamedArgs) -> AggregateResult {
        self.send_catch_log_with(signal, named, &DontLog::none())
    }

    /// Fires a signal synchronously with extra kinds excluded from logging
    pub fn send_catch_log_with(
        &self,
        signal: Signal,
        named: NamedArgs,
        dont_log: &DontLog,
    ) -> AggregateResult {
        sync::send_catch_log(
            &self.registry,
            signal,
            self.sender.clone(),
            named,
            &self.dont_log.merged(dont_log),
        )
    }

    /// Fires a signal and waits for every receiver; see
    /// [`deferred::send_catch_log_deferred`]
    pub async fn send_catch_log_deferred(&self, signal: Signal, named: NamedArgs) -> AggregateResult {
        self.send_catch_log_deferred_with(signal, named, &DontLog::none())
            .await
    }

    /// Fires a signal and waits for every receiver, with extra kinds
    /// excluded from logging
    pub async fn send_catch_log_deferred_with(
        &self,
        signal: Signal,
        named: NamedArgs,
        dont_log: &DontLog,
    ) -> AggregateResult {
        let dont_log = self.dont_log.merged(dont_log);
        deferred::send_catch_log_deferred(
            &self.registry,
            signal,
            self.sender.clone(),
            named,
            &dont_log,
        )
        .await
    }

    /// Fires a signal and fails on the first receiver error; see
    /// [`deferred::send_deferred`]
    pub async fn send_deferred(
        &self,
        signal: Signal,
        named: NamedArgs,
    ) -> Result<Vec<(Receiver, Value)>, Failure> {
        deferred::send_deferred(&self.registry, signal, self.sender.clone(), named).await
    }
}
