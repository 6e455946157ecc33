//! Pooled completion source
//!
//! This backend does not allocate a synchronization object of its own: it is
//! a token into a `SlotPool`, whose slots are reused from one result to the
//! next. Blocking readers spin, then yield, then nap until the slot gets
//! completed, which suits results that are expected to complete quickly.
//!
//! Since pool slots are consumed by the first read, the handle caches the
//! outcome it consumed, so that it can be read again. Once consumed, the
//! token may belong to another result, so the handle never touches the pool
//! again.

use crate::error::{Failure, PoolError};
use crate::pool::{SlotPool, Token};
use crate::sink::ErrorSink;
use crate::source::{CompletionSource, Continuation};
use crate::status::{self, Payload, Status};
use crossbeam_utils::Backoff;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;


/// Nap duration of blocking readers, once spinning and yielding gave up
const NAP: Duration = Duration::from_micros(200);


/// Completion source backed by a slot of a `SlotPool`
pub struct PooledSource<T: Payload> {
    /// Pool holding our slot
    pool: Arc<SlotPool<T>>,

    /// Our slot's token, which stays ours until it is consumed
    token: Token,

    /// Outcome consumed from the pool, if any
    consumed: Mutex<Option<Result<T, Failure>>>,
}
//
impl<T: Payload> PooledSource<T> {
    /// Reserve a slot in some pool
    pub fn new(pool: Arc<SlotPool<T>>) -> Result<Self, PoolError> {
        let token = pool.issue_token()?;
        Ok(PooledSource { pool, token, consumed: Mutex::new(None) })
    }

    /// Reserve a slot in the process-wide pool of this value type
    pub fn shared() -> Result<Self, PoolError> {
        Self::new(SlotPool::shared())
    }

    /// Fail fast if our outcome was consumed already, since our token may
    /// have been issued to another result since then
    fn check_unconsumed(&self) {
        if self.consumed.lock().is_some() {
            panic!("asynchronous result completed twice");
        }
    }

    /// Token of our slot
    pub fn token(&self) -> Token {
        self.token
    }
}
//
impl<T: Payload> CompletionSource<T> for PooledSource<T> {
    fn set_value(&self, value: T) {
        self.check_unconsumed();
        self.pool.set_result(self.token, value);
    }

    fn set_error(&self, failure: Failure, sink: &dyn ErrorSink) {
        self.check_unconsumed();
        self.pool.set_exception_reported(self.token, failure, sink);
    }

    fn is_completed(&self) -> bool {
        self.status() != Status::Pending
    }

    fn status(&self) -> Status {
        let consumed = self.consumed.lock();
        match consumed.as_ref() {
            Some(outcome) => Status::of(Some(outcome)),
            None => self.pool.get_status(self.token),
        }
    }

    fn try_outcome(&self) -> Option<Result<T, Failure>> {
        // Holding this lock keeps our token live while we look at the pool
        let mut consumed = self.consumed.lock();
        if consumed.is_none()
           && status::is_final(self.pool.get_status(self.token))
        {
            *consumed = Some(self.pool.get_result(self.token));
        }
        consumed.clone()
    }

    fn wait(&self) -> Result<T, Failure> {
        let backoff = Backoff::new();
        loop {
            if let Some(outcome) = self.try_outcome() {
                return outcome;
            }
            if backoff.is_completed() {
                thread::sleep(NAP);
            } else {
                backoff.snooze();
            }
        }
    }

    fn register_continuation(&self, continuation: Continuation) {
        let ready = {
            let consumed = self.consumed.lock();
            if consumed.is_some() {
                Some(continuation)
            } else {
                self.pool.register_or_return(self.token, continuation)
            }
        };
        if let Some(ready) = ready {
            ready();
        }
    }
}
//
impl<T: Payload> Drop for PooledSource<T> {
    /// Give our slot back to the pool if nobody consumed it
    fn drop(&mut self) {
        if self.consumed.get_mut().is_none() {
            self.pool.release(self.token);
        }
    }
}
