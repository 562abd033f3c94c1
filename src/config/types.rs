use serde::Deserialize;

/// Main configuration structure for sumi-signals
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

/// Defaults applied by the signal manager
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Label of the manager's default sender
    #[serde(rename = "sender-name", default = "default_sender_name")]
    pub sender_name: String,

    /// Error kinds never logged by catch-and-log firings
    /// (e.g. "drop-item", "ignore-request")
    #[serde(rename = "dont-log", default)]
    pub dont_log: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive used at verbosity 0
    #[serde(default = "default_filter")]
    pub filter: String,
}

/// Engine status report configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StatusConfig {
    /// Print the engine status report when the run finishes
    #[serde(default = "default_report")]
    pub report: bool,
}

fn default_sender_name() -> String {
    "engine".to_string()
}

fn default_filter() -> String {
    "sumi_signals=info".to_string()
}

fn default_report() -> bool {
    true
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            sender_name: default_sender_name(),
            dont_log: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            report: default_report(),
        }
    }
}
