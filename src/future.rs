//! Asynchronous results which never throw
//!
//! A `ResultFuture` is a clonable handle to the outcome of an asynchronous
//! operation. The producer side completes it exactly once, with a value or
//! with a failure. Failures are handed over to the error sink of the
//! configuration, and readers only ever see a `Response`, which is invalid if
//! the operation failed.
//!
//! Readers can poll the future (`is_completed()`), block on it
//! (`get_value()`), suspend on it through an `Awaiter` (`.await` or the
//! explicit suspension protocol), or convert it into a `Bridge`, a standard
//! future which resolves with the same response.

use crate::awaiter::{Awaitable, Awaiter};
use crate::bridge::Bridge;
use crate::config::Config;
use crate::error::Failure;
use crate::response::Response;
use crate::source::{self, CompletionSource};
use crate::status::{Payload, Status};
use futures::channel::oneshot;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;


/// Handle to an asynchronous result
pub struct ResultFuture<T: Payload> {
    inner: Arc<Inner<T>>,
}
//
struct Inner<T: Payload> {
    /// Completion backend
    source: Box<dyn CompletionSource<T>>,

    /// Configuration this future was created under
    config: Config,

    /// Bridged standard future, built on first request
    bridge: OnceCell<Bridge<T>>,

    /// Resolver of the bridge, while it waits for completion. The lock also
    /// serializes bridge construction.
    bridge_resolver: Mutex<Option<oneshot::Sender<Result<T, Failure>>>>,
}
//
impl<T: Payload> ResultFuture<T> {
    /// Create a pending future under the process-wide configuration
    pub fn pending() -> Self {
        Self::pending_with(Config::global())
    }

    /// Create a pending future under some configuration
    pub fn pending_with(config: &Config) -> Self {
        Self::from_source(source::create_source(config.backend()),
                          config.clone())
    }

    /// Create a future already completed with a value
    pub fn completed(value: T) -> Self {
        Self::completed_with(value, Config::global())
    }

    /// Create a future already completed with a value, under some
    /// configuration
    pub fn completed_with(value: T, config: &Config) -> Self {
        let future = Self::pending_with(config);
        future.set_value(value);
        future
    }

    /// Create a future which already failed, reporting the failure
    pub fn failed(error: impl Into<Failure>) -> Self {
        Self::failed_with(error, Config::global())
    }

    /// Create a future which already failed, under some configuration
    pub fn failed_with(error: impl Into<Failure>, config: &Config) -> Self {
        let future = Self::pending_with(config);
        future.set_error(error);
        future
    }

    /// Create a pending future around a custom completion backend
    pub fn from_source(source: Box<dyn CompletionSource<T>>,
                       config: Config) -> Self {
        ResultFuture {
            inner: Arc::new(Inner {
                source,
                config,
                bridge: OnceCell::new(),
                bridge_resolver: Mutex::new(None),
            }),
        }
    }

    /// Complete the future with a value
    ///
    /// The continuation, if any, runs on the calling thread before this
    /// method returns. Completing a future twice panics.
    ///
    pub fn set_value(&self, value: T) {
        self.inner.source.set_value(value);
        self.resolve_bridge();
    }

    /// Complete the future with a failure
    ///
    /// The failure is handed to the error sink, and readers will see an
    /// invalid response. Completing a future twice panics, without reporting
    /// anything.
    ///
    pub fn set_error(&self, error: impl Into<Failure>) {
        self.inner.source.set_error(error.into(), self.inner.config.sink());
        self.resolve_bridge();
    }

    /// Block until the future is completed, then return its response
    ///
    /// Continuations run on the completing thread, so a continuation must not
    /// block on a future which is only completed after it returns.
    ///
    pub fn get_value(&self) -> Response<T> {
        self.inner.source.get_value()
    }

    /// Response of the future if it is completed (non-blocking)
    pub fn try_get_value(&self) -> Option<Response<T>> {
        self.inner
            .source
            .try_outcome()
            .map(|outcome| Response::from(outcome.ok()))
    }

    /// Truth that the future is completed (non-blocking)
    pub fn is_completed(&self) -> bool {
        self.inner.source.is_completed()
    }

    /// Current status of the future (non-blocking)
    pub fn status(&self) -> Status {
        self.inner.source.status()
    }

    /// Configuration this future was created under
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Suspension point adapter of this future
    pub fn awaiter(&self) -> Awaiter<T> {
        Awaiter::new(self.clone())
    }

    /// Standard future resolving with this future's response
    ///
    /// The bridge is built on first request, and every later request returns
    /// the same bridge. If this future is already completed, the bridge is
    /// resolved from the start. How failures come out of the bridge is
    /// decided by the configuration's `BridgePolicy`.
    ///
    pub fn bridge(&self) -> Bridge<T> {
        if let Some(bridge) = self.inner.bridge.get() {
            return bridge.clone();
        }

        let mut resolver = self.inner.bridge_resolver.lock();
        if let Some(bridge) = self.inner.bridge.get() {
            return bridge.clone();
        }
        let (sender, receiver) = oneshot::channel();
        match self.inner.source.try_outcome() {
            Some(outcome) => {
                let _ = sender.send(outcome);
            }
            None => *resolver = Some(sender),
        }
        let bridge = Bridge::new(receiver, self.inner.config.bridge_policy());
        let _ = self.inner.bridge.set(bridge.clone());
        bridge
    }

    /// Truth that two handles refer to the same future
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Resolve the bridge after completion, if it was built before
    fn resolve_bridge(&self) {
        // Completion was published before this lock is taken, so a bridge
        // built concurrently either saw it or left its resolver for us
        let resolver = self.inner.bridge_resolver.lock().take();
        if let Some(resolver) = resolver {
            if let Some(outcome) = self.inner.source.try_outcome() {
                let _ = resolver.send(outcome);
            }
        }
    }
}
//
impl<T: Payload> Clone for ResultFuture<T> {
    fn clone(&self) -> Self {
        ResultFuture { inner: self.inner.clone() }
    }
}
//
impl<T: Payload> Awaitable for ResultFuture<T> {
    fn is_ready(&self) -> bool {
        self.is_completed()
    }

    fn on_suspend<F>(&self, continuation: F)
        where F: FnOnce() + Send + 'static
    {
        self.inner.source.register_continuation(Box::new(continuation));
    }
}
//
impl<T: Payload + PartialEq> PartialEq for ResultFuture<T> {
    /// Futures are equal if they are the same future, or if both are
    /// completed with equal responses
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self.try_get_value(), other.try_get_value()) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => false,
        }
    }
}
//
impl<T: Payload + fmt::Debug> fmt::Debug for ResultFuture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultFuture")
         .field("response", &self.try_get_value())
         .finish()
    }
}
