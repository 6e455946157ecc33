//! Exclusive completion state
//!
//! This is the default backend: each asynchronous result gets its own state,
//! whose terminal outcome is published through a set-once cell. Once the
//! outcome is published, every read is a plain acquire load, without any
//! locking. Locks are only involved in continuation registration and in
//! blocking waits, which are both off the hot path.

use crate::error::Failure;
use crate::sink::ErrorSink;
use crate::source::{self, CompletionSource, Continuation};
use crate::status::Payload;
use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};


/// Completion state owned by a single asynchronous result
pub struct CompletionState<T: Payload> {
    /// Terminal outcome, written at most once
    outcome: OnceCell<Result<T, Failure>>,

    /// Code to be run on completion
    continuations: Mutex<Vec<Continuation>>,

    /// Lock and condition variable used by blocking readers
    wait_lock: Mutex<()>,
    completed_cv: Condvar,
}
//
impl<T: Payload> CompletionState<T> {
    /// Create a pending completion state
    pub fn new() -> Self {
        CompletionState {
            outcome: OnceCell::new(),
            continuations: Mutex::new(Vec::new()),
            wait_lock: Mutex::new(()),
            completed_cv: Condvar::new(),
        }
    }

    /// Write the terminal outcome, then notify everyone
    fn complete(&self,
                outcome: Result<T, Failure>,
                sink: Option<&dyn ErrorSink>) {
        let failure = outcome.as_ref().err().cloned();
        if self.outcome.set(outcome).is_err() {
            panic!("asynchronous result completed twice");
        }
        if let (Some(sink), Some(failure)) = (sink, failure) {
            sink.report(&failure);
        }

        // Wake up blocking readers...
        {
            let _guard = self.wait_lock.lock();
            self.completed_cv.notify_all();
        }

        // ...and run the continuations outside of the lock
        let continuations = std::mem::take(&mut *self.continuations.lock());
        source::run_continuations(continuations);
    }
}
//
impl<T: Payload> Default for CompletionState<T> {
    fn default() -> Self {
        Self::new()
    }
}
//
impl<T: Payload> CompletionSource<T> for CompletionState<T> {
    fn set_value(&self, value: T) {
        self.complete(Ok(value), None);
    }

    fn set_error(&self, failure: Failure, sink: &dyn ErrorSink) {
        self.complete(Err(failure), Some(sink));
    }

    fn is_completed(&self) -> bool {
        self.outcome.get().is_some()
    }

    fn try_outcome(&self) -> Option<Result<T, Failure>> {
        self.outcome.get().cloned()
    }

    fn wait(&self) -> Result<T, Failure> {
        if let Some(outcome) = self.outcome.get() {
            return outcome.clone();
        }
        let mut guard = self.wait_lock.lock();
        loop {
            if let Some(outcome) = self.outcome.get() {
                return outcome.clone();
            }
            self.completed_cv.wait(&mut guard);
        }
    }

    fn register_continuation(&self, continuation: Continuation) {
        // The writer publishes the outcome before taking this lock, so
        // checking it under the lock cannot miss a completion
        let mut continuations = self.continuations.lock();
        if self.outcome.get().is_some() {
            drop(continuations);
            continuation();
        } else {
            continuations.push(continuation);
        }
    }
}
