//! Receivers and their invocation contract
//!
//! A [`Receiver`] is a strong, cloneable handle over a callable. The registry
//! only keeps weak handles, so a receiver lives exactly as long as some
//! component holds one of its clones.
//!
//! Every receiver carries a declared parameter set. Dispatch arguments are
//! filtered against it before the call, so receivers can accept any subset of
//! the arguments a signal publishes.

use crate::registry::ReceiverError;
use crate::signal::{Sender, Signal};
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_RECEIVER_ID: AtomicU64 = AtomicU64::new(1);

/// Named dispatch arguments supplied by the firing component
pub type NamedArgs = BTreeMap<String, Value>;

/// Result of a receiver invocation once it has completed
pub type ReceiverResult = Result<Value, ReceiverError>;

/// Builds a [`NamedArgs`] map from name/value pairs
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use sumi_signals::registry::named;
///
/// let args = named([("spider", json!("example")), ("depth", json!(2))]);
/// assert_eq!(args.len(), 2);
/// ```
pub fn named<K, I>(pairs: I) -> NamedArgs
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Value)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| (name.into(), value))
        .collect()
}

/// Parameter names a receiver declares
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Params {
    /// Accept every named argument
    #[default]
    All,

    /// Accept only the listed names
    Only(BTreeSet<String>),
}

impl Params {
    /// Creates a parameter set from a list of names
    pub fn only<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    /// Returns true if an argument with this name is passed to the receiver
    pub fn accepts(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(names) => names.contains(name),
        }
    }
}

/// Arguments presented to a receiver for one firing
///
/// The signal and sender metadata are always present; the named arguments
/// are limited to what the receiver declared.
#[derive(Debug, Clone)]
pub struct Arguments {
    signal: Signal,
    sender: Sender,
    named: NamedArgs,
}

impl Arguments {
    /// Creates the argument set for a firing
    pub fn new(signal: Signal, sender: Sender, named: NamedArgs) -> Self {
        Self {
            signal,
            sender,
            named,
        }
    }

    /// Returns the signal being fired
    pub fn signal(&self) -> Signal {
        self.signal
    }

    /// Returns the sender of the firing
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Gets a named argument
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    /// Gets a named argument as a string slice
    ///
    /// Returns None if the argument is missing or not a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.named.get(name).and_then(Value::as_str)
    }

    /// Gets a named argument, failing the invocation if it is missing
    pub fn require(&self, name: &str) -> Result<&Value, ReceiverError> {
        self.named
            .get(name)
            .ok_or_else(|| ReceiverError::MissingArgument(name.to_string()))
    }

    /// Deserializes a named argument into a typed value
    pub fn parse<T: DeserializeOwned>(&self, name: &str) -> Result<T, ReceiverError> {
        let value = self.require(name)?;
        serde_json::from_value(value.clone()).map_err(|e| {
            ReceiverError::Other(anyhow::Error::new(e).context(format!("argument '{}'", name)))
        })
    }

    /// Returns true if the named argument is present
    pub fn contains(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    /// Returns the names of all present arguments in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }

    /// Returns the spider argument used as log context, if any
    pub fn spider(&self) -> Option<&Value> {
        self.named.get("spider")
    }

    /// Returns a copy restricted to the given parameter set
    pub fn filtered(&self, params: &Params) -> Self {
        let named = match params {
            Params::All => self.named.clone(),
            Params::Only(_) => self
                .named
                .iter()
                .filter(|(name, _)| params.accepts(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        };

        Self {
            signal: self.signal,
            sender: self.sender.clone(),
            named,
        }
    }
}

/// What a receiver hands back when invoked
pub enum Response {
    /// The receiver finished during the call
    Ready(ReceiverResult),

    /// The receiver started work that completes later
    Pending(BoxFuture<'static, ReceiverResult>),
}

impl Response {
    /// Creates a pending response from a future
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = ReceiverResult> + Send + 'static,
    {
        Self::Pending(future.boxed())
    }

    /// Returns true for [`Response::Pending`]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Normalizes the response into a future
    ///
    /// Ready results become already-completed futures. A panic while polling
    /// a pending future resolves to [`ReceiverError::Panicked`].
    pub fn into_future(self) -> BoxFuture<'static, ReceiverResult> {
        match self {
            Self::Ready(result) => futures::future::ready(result).boxed(),
            Self::Pending(future) => AssertUnwindSafe(future)
                .catch_unwind()
                .map(|polled| match polled {
                    Ok(result) => result,
                    Err(panic) => Err(ReceiverError::Panicked(panic_message(panic.as_ref()))),
                })
                .boxed(),
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(result) => f.debug_tuple("Ready").field(result).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

type Callback = dyn Fn(&Arguments) -> Response + Send + Sync;

pub(crate) struct ReceiverInner {
    id: u64,
    name: String,
    params: Params,
    callback: Box<Callback>,
}

/// Weak handle stored by the registry
pub(crate) type WeakReceiver = Weak<ReceiverInner>;

/// A registered callable invoked on firings it is subscribed to
///
/// Cloning is cheap and every clone is the same receiver. Dropping the last
/// clone expires all of the receiver's registrations.
#[derive(Clone)]
pub struct Receiver {
    inner: Arc<ReceiverInner>,
}

impl Receiver {
    /// Starts building a receiver with the given display name
    pub fn builder(name: impl Into<String>) -> ReceiverBuilder {
        ReceiverBuilder {
            name: name.into(),
            params: Params::All,
        }
    }

    /// Creates a receiver that completes during the call and accepts every argument
    pub fn sync<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Arguments) -> ReceiverResult + Send + Sync + 'static,
    {
        Self::builder(name).sync(callback)
    }

    /// Creates a receiver returning a future and accepting every argument
    pub fn deferred<F, Fut>(name: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ReceiverResult> + Send + 'static,
    {
        Self::builder(name).deferred(callback)
    }

    /// Returns the unique identity of this receiver
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Returns the display name used in log records
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the declared parameter set
    pub fn params(&self) -> &Params {
        &self.inner.params
    }

    /// Invokes the receiver with the arguments it declared
    ///
    /// A panic raised during the call is turned into a
    /// [`ReceiverError::Panicked`] result.
    pub fn invoke(&self, arguments: &Arguments) -> Response {
        let filtered = arguments.filtered(&self.inner.params);
        tracing::trace!(
            receiver = %self.inner.name,
            signal = %arguments.signal(),
            "Invoking signal handler"
        );

        match catch_unwind(AssertUnwindSafe(|| (self.inner.callback)(&filtered))) {
            Ok(response) => response,
            Err(panic) => Response::Ready(Err(ReceiverError::Panicked(panic_message(
                panic.as_ref(),
            )))),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakReceiver {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &WeakReceiver) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn is_handle_of(&self, weak: &WeakReceiver) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.inner), weak.as_ptr())
    }
}

impl PartialEq for Receiver {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Receiver {}

impl fmt::Debug for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Receiver")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("params", &self.inner.params)
            .finish()
    }
}

impl fmt::Display for Receiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

/// Builder for receivers with a declared parameter set
pub struct ReceiverBuilder {
    name: String,
    params: Params,
}

impl ReceiverBuilder {
    /// Restricts the named arguments passed to the receiver
    pub fn params<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.params = Params::only(names);
        self
    }

    /// Finishes with a callback that may return either kind of response
    pub fn respond<F>(self, callback: F) -> Receiver
    where
        F: Fn(&Arguments) -> Response + Send + Sync + 'static,
    {
        Receiver {
            inner: Arc::new(ReceiverInner {
                id: NEXT_RECEIVER_ID.fetch_add(1, Ordering::Relaxed),
                name: self.name,
                params: self.params,
                callback: Box::new(callback),
            }),
        }
    }

    /// Finishes with a callback that completes during the call
    pub fn sync<F>(self, callback: F) -> Receiver
    where
        F: Fn(&Arguments) -> ReceiverResult + Send + Sync + 'static,
    {
        self.respond(move |args| Response::Ready(callback(args)))
    }

    /// Finishes with a callback returning a future
    pub fn deferred<F, Fut>(self, callback: F) -> Receiver
    where
        F: Fn(&Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ReceiverResult> + Send + 'static,
    {
        self.respond(move |args| Response::pending(callback(args)))
    }
}

/// Extracts a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
