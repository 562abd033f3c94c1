//! Signal and sender identities
//!
//! Both are opaque routing keys. Equality and hashing only look at the numeric
//! identity; the attached names exist for log output.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// First id handed out by [`Signal::new`]. Ids below it are reserved for the
/// wildcard and the well-known signal catalog.
const FIRST_DYNAMIC_SIGNAL_ID: u64 = 1024;

static NEXT_SIGNAL_ID: AtomicU64 = AtomicU64::new(FIRST_DYNAMIC_SIGNAL_ID);
static NEXT_SENDER_ID: AtomicU64 = AtomicU64::new(1);

/// A named event category receivers subscribe to
///
/// Two signals created with the same name are still distinct signals.
#[derive(Clone, Copy)]
pub struct Signal {
    id: u64,
    name: &'static str,
}

impl Signal {
    /// Wildcard signal: registrations under it receive every signal, and
    /// lookups with it consult only wildcard registrations.
    pub const ANY: Signal = Signal { id: 0, name: "Any" };

    /// Creates a new signal with a fresh identity
    pub fn new(name: &'static str) -> Self {
        Self {
            id: NEXT_SIGNAL_ID.fetch_add(1, Ordering::Relaxed),
            name,
        }
    }

    /// Declares a signal with a fixed identity from the reserved range
    pub(crate) const fn reserved(id: u64, name: &'static str) -> Self {
        Self { id, name }
    }

    /// Returns the numeric identity of this signal
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the human readable name of this signal
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns true if this is the [`Signal::ANY`] wildcard
    pub fn is_any(&self) -> bool {
        self.id == Self::ANY.id
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Signal {}

impl Hash for Signal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signal({}#{})", self.name, self.id)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Identity of a concrete sender
#[derive(Clone)]
pub struct SenderId {
    id: u64,
    label: Arc<str>,
}

impl SenderId {
    /// Returns the numeric identity
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the label given at creation
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl PartialEq for SenderId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SenderId {}

impl Hash for SenderId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.label, self.id)
    }
}

/// The logical origin of a firing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Sender {
    /// Default sender used when a firing does not name its origin
    #[default]
    Anonymous,

    /// Wildcard: matches every sender
    Any,

    /// A concrete origin (engine, scraper, a spider, ...)
    Id(SenderId),
}

impl Sender {
    /// Creates a concrete sender with a fresh identity
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self::Id(SenderId {
            id: NEXT_SENDER_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
        })
    }

    /// Returns true if this is the [`Sender::Any`] wildcard
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Any => f.write_str("Any"),
            Self::Id(id) => write!(f, "{:?}", id),
        }
    }
}
