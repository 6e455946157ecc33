//! Completion backends
//!
//! A completion source is the shared box in which the terminal outcome of an
//! asynchronous result is written, exactly once, by a producer, and from which
//! any number of readers retrieve it. Three implementations of this contract
//! are proposed, which differ in allocation and blocking behaviour:
//!
//! - The exclusive completion state (`state`) is allocated once per result,
//!   and publishes the outcome through a set-once cell so that reads never
//!   take a lock. Synchronous readers block on a condition variable.
//! - The signal state (`signal`) keeps everything behind a single mutex and
//!   wakes up synchronous readers through a condition variable. It is simple
//!   to reason about, but every read takes the lock.
//! - The pooled source (`pooled`) does not allocate any synchronization
//!   object of its own. It is a token into a shared `SlotPool`, and blocking
//!   readers spin, then yield, until the slot is completed.
//!
//! All implementations share the same completion contract. Completing a
//! source twice is a programmer error which panics, and reports nothing.
//! Registered continuations are run in registration order, on the thread
//! which performs the terminal write, right after the outcome became visible.
//! A continuation registered after completion runs immediately on the
//! registering thread.

pub mod pooled;
pub mod signal;
pub mod state;

use crate::config::BackendKind;
use crate::error::Failure;
use crate::response::Response;
use crate::sink::ErrorSink;
use crate::status::{Payload, Status};

pub use self::pooled::PooledSource;
pub use self::signal::SignalState;
pub use self::state::CompletionState;


/// Code to be run when an asynchronous result is completed
pub type Continuation = Box<dyn FnOnce() + Send + 'static>;


/// Shared storage of an asynchronous result's terminal outcome
pub trait CompletionSource<T: Payload>: Send + Sync {
    /// Complete with a value
    fn set_value(&self, value: T);

    /// Complete with a failure
    ///
    /// The failure is handed to `sink` once it became the outcome, before any
    /// continuation runs. A rejected second completion reports nothing.
    ///
    fn set_error(&self, failure: Failure, sink: &dyn ErrorSink);

    /// Truth that a terminal outcome was written (non-blocking)
    fn is_completed(&self) -> bool;

    /// Copy of the terminal outcome, if it was written already
    fn try_outcome(&self) -> Option<Result<T, Failure>>;

    /// Block until the terminal outcome is written, then return a copy of it
    fn wait(&self) -> Result<T, Failure>;

    /// Schedule code to be run once the source is completed
    ///
    /// Every continuation registered while the source is pending is run
    /// exactly once, upon completion.
    ///
    fn register_continuation(&self, continuation: Continuation);

    /// Current status (non-blocking)
    fn status(&self) -> Status {
        Status::of(self.try_outcome().as_ref())
    }

    /// Block until completion, then return the outcome as a response
    fn get_value(&self) -> Response<T> {
        Response::from(self.wait().ok())
    }
}


/// Run continuations collected while a source was pending
pub(crate) fn run_continuations(continuations: Vec<Continuation>) {
    for continuation in continuations {
        continuation();
    }
}


/// Create a pending completion source with the requested backend
///
/// If the slot pool of the value type is exhausted, the exclusive backend is
/// used instead.
///
pub fn create_source<T: Payload>(
    backend: BackendKind
) -> Box<dyn CompletionSource<T>> {
    match backend {
        BackendKind::Exclusive => Box::new(CompletionState::new()),
        BackendKind::Signal => Box::new(SignalState::new()),
        BackendKind::Pooled => match PooledSource::shared() {
            Ok(source) => Box::new(source),
            Err(error) => {
                tracing::warn!(%error,
                               "falling back to an exclusive completion state");
                Box::new(CompletionState::new())
            }
        },
    }
}
