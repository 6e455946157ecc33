//! Signal-based completion state
//!
//! This backend keeps the terminal outcome and the continuation behind a
//! single mutex, and notifies blocking readers through a condition variable.
//! It is easy to reason about, but should be used with care in read-heavy
//! scenarios, as every read takes the lock.

use crate::error::Failure;
use crate::sink::ErrorSink;
use crate::source::{self, CompletionSource, Continuation};
use crate::status::Payload;
use parking_lot::{Condvar, Mutex};


/// Completion state protected by a mutex and a condition variable
pub struct SignalState<T: Payload> {
    /// Current outcome and continuation (mutex-protected)
    status_lock: Mutex<SignalSlot<T>>,

    /// Condition variable used to notify readers about completion
    completed_cv: Condvar,
}
//
struct SignalSlot<T> {
    /// Terminal outcome, if written already
    outcome: Option<Result<T, Failure>>,

    /// Code to be run on completion
    continuations: Vec<Continuation>,
}
//
impl<T: Payload> SignalState<T> {
    /// Create a pending signal state
    pub fn new() -> Self {
        SignalState {
            status_lock: Mutex::new(SignalSlot { outcome: None,
                                                 continuations: Vec::new() }),
            completed_cv: Condvar::new(),
        }
    }

    /// Write the terminal outcome, then notify everyone
    fn complete(&self,
                outcome: Result<T, Failure>,
                sink: Option<&dyn ErrorSink>) {
        let failure = outcome.as_ref().err().cloned();

        // Update the outcome and fetch the continuations
        let continuations = {
            let mut slot = self.status_lock.lock();
            if slot.outcome.is_some() {
                panic!("asynchronous result completed twice");
            }
            slot.outcome = Some(outcome);
            std::mem::take(&mut slot.continuations)
        };
        if let (Some(sink), Some(failure)) = (sink, failure) {
            sink.report(&failure);
        }

        // Notify blocking readers that completion has occurred
        self.completed_cv.notify_all();

        // Run the continuations outside of the lock
        source::run_continuations(continuations);
    }
}
//
impl<T: Payload> Default for SignalState<T> {
    fn default() -> Self {
        Self::new()
    }
}
//
impl<T: Payload> CompletionSource<T> for SignalState<T> {
    fn set_value(&self, value: T) {
        self.complete(Ok(value), None);
    }

    fn set_error(&self, failure: Failure, sink: &dyn ErrorSink) {
        self.complete(Err(failure), Some(sink));
    }

    fn is_completed(&self) -> bool {
        self.status_lock.lock().outcome.is_some()
    }

    fn try_outcome(&self) -> Option<Result<T, Failure>> {
        self.status_lock.lock().outcome.clone()
    }

    fn wait(&self) -> Result<T, Failure> {
        let mut slot = self.status_lock.lock();
        loop {
            if let Some(outcome) = slot.outcome.as_ref() {
                return outcome.clone();
            }
            self.completed_cv.wait(&mut slot);
        }
    }

    fn register_continuation(&self, continuation: Continuation) {
        let mut slot = self.status_lock.lock();
        if slot.outcome.is_some() {
            drop(slot);
            continuation();
        } else {
            slot.continuations.push(continuation);
        }
    }
}
