//! Token-indexed completion slots
//!
//! Allocating a fresh synchronization object for every asynchronous result
//! can be a significant overhead when results are short-lived and numerous.
//! A slot pool avoids this by keeping a fixed array of completion slots, and
//! handing out small numeric tokens which index into it.
//!
//! Each token goes through the following lifecycle:
//!
//! - `issue_token()` reserves a vacant slot and returns its token
//! - exactly one producer completes it via `set_result()` or `set_exception()`
//! - exactly one consumer reads it via `get_result()`, which frees the slot
//!
//! Tokens are issued by an atomic counter which cycles through the range
//! `[BASE_TOKEN, MAX_TOKEN]`. Only crossing the end of that range takes a
//! lock. Tokens whose slot is still held by an unconsumed result are skipped,
//! so a live token is never issued twice. If every slot is held,
//! `issue_token()` fails with `PoolError::Exhausted`.
//!
//! Using a token which is not live (never issued, or already consumed) is a
//! programmer error, and panics. Two consumers racing on the same token is
//! API misuse: the pool only guarantees that the loser panics.

use crate::error::{Failure, PoolError};
use crate::sink::ErrorSink;
use crate::source::{self, Continuation};
use crate::status::{Payload, Status};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::mem;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};


/// Smallest token value
pub const BASE_TOKEN: u16 = 1;

/// Largest token value, and capacity of a default pool
pub const MAX_TOKEN: u16 = 16383;


/// Process-wide pools, one per value type
static SHARED_POOLS: Lazy<Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));


/// Handle to a completion slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u16);
//
impl Token {
    /// Numerical value of the token
    pub fn get(self) -> u16 {
        self.0
    }
}
//
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}


/// Contents of a completion slot
enum Slot<T> {
    /// No live token refers to this slot
    Vacant,

    /// Issued, waiting for its producer
    Pending(Vec<Continuation>),

    /// Completed, waiting for its consumer
    Ready(Result<T, Failure>),
}


/// Fixed-size table of completion slots
pub struct SlotPool<T: Payload> {
    /// Slot of token N lives at index N - BASE_TOKEN
    slots: Box<[Mutex<Slot<T>>]>,

    /// Next token to be tried by issue_token()
    next_token: AtomicU32,

    /// Taken when the token counter crosses the end of the token range
    wrap_lock: Mutex<()>,

    /// Largest token of this pool
    max_token: u16,
}
//
impl<T: Payload> SlotPool<T> {
    /// Create a pool with the full token range
    pub fn new() -> Self {
        Self::with_capacity(MAX_TOKEN)
    }

    /// Create a pool of `capacity` slots, with tokens `[1, capacity]`
    pub fn with_capacity(capacity: u16) -> Self {
        assert!(capacity >= BASE_TOKEN && capacity <= MAX_TOKEN,
                "slot pool capacity must lie within [{}, {}]",
                BASE_TOKEN, MAX_TOKEN);
        let slots = (0..capacity).map(|_| Mutex::new(Slot::Vacant))
                                 .collect::<Vec<_>>()
                                 .into_boxed_slice();
        SlotPool {
            slots,
            next_token: AtomicU32::new(u32::from(BASE_TOKEN)),
            wrap_lock: Mutex::new(()),
            max_token: capacity,
        }
    }

    /// Process-wide pool of this value type
    pub fn shared() -> Arc<Self> {
        let pool = SHARED_POOLS.lock()
                               .entry(TypeId::of::<T>())
                               .or_insert_with(|| {
                                   Arc::new(Self::new())
                                       as Arc<dyn Any + Send + Sync>
                               })
                               .clone();
        match pool.downcast::<Self>() {
            Ok(pool) => pool,
            Err(_) => unreachable!("slot pool registered under a foreign type"),
        }
    }

    /// Number of slots in this pool
    pub fn capacity(&self) -> u16 {
        self.max_token
    }

    /// Number of slots currently held by a live token
    pub fn live_tokens(&self) -> usize {
        self.slots.iter()
                  .filter(|slot| !matches!(*slot.lock(), Slot::Vacant))
                  .count()
    }

    /// Reserve a vacant slot
    pub fn issue_token(&self) -> Result<Token, PoolError> {
        for _ in 0..self.max_token {
            let token = Token(self.next_raw_token());
            let mut slot = self.slot(token).lock();
            if let Slot::Vacant = *slot {
                *slot = Slot::Pending(Vec::new());
                tracing::trace!(%token, "issued slot token");
                return Ok(token);
            }
            tracing::trace!(%token, "skipped slot token held by a live result");
        }
        tracing::warn!(capacity = self.max_token, "slot pool exhausted");
        Err(PoolError::Exhausted { capacity: self.max_token })
    }

    /// Complete a slot with a value, then run its continuations
    pub fn set_result(&self, token: Token, value: T) {
        self.complete(token, Ok(value), None);
    }

    /// Complete a slot with a failure, then run its continuations
    pub fn set_exception(&self, token: Token, failure: Failure) {
        self.complete(token, Err(failure), None);
    }

    /// Complete a slot with a failure, report it to `sink` once the slot
    /// accepted it, then run the slot's continuations
    pub(crate) fn set_exception_reported(&self,
                                         token: Token,
                                         failure: Failure,
                                         sink: &dyn ErrorSink) {
        self.complete(token, Err(failure), Some(sink));
    }

    /// Schedule `continuation(state)` to be run once the slot is completed
    ///
    /// If the slot is completed already, the continuation runs immediately.
    /// Otherwise, it runs upon completion, after the continuations which were
    /// registered before it.
    ///
    pub fn register_continuation<S, F>(&self,
                                       token: Token,
                                       continuation: F,
                                       state: S)
        where S: Send + 'static,
              F: FnOnce(S) + Send + 'static
    {
        let bound: Continuation = Box::new(move || continuation(state));
        if let Some(ready) = self.register_or_return(token, bound) {
            ready();
        }
    }

    /// Fetch the outcome of a completed slot and free the slot
    ///
    /// Unlike result future readers, this hands captured failures back to the
    /// caller, for use by contracts which propagate errors.
    ///
    pub fn get_result(&self, token: Token) -> Result<T, Failure> {
        let mut slot = self.slot(token).lock();
        match mem::replace(&mut *slot, Slot::Vacant) {
            Slot::Ready(outcome) => {
                tracing::trace!(%token, "consumed slot token");
                outcome
            }
            Slot::Pending(continuations) => {
                *slot = Slot::Pending(continuations);
                panic!("slot token {} was read before completion", token);
            }
            Slot::Vacant => {
                panic!("slot token {} was never issued or already consumed",
                       token);
            }
        }
    }

    /// Status of a live slot
    pub fn get_status(&self, token: Token) -> Status {
        self.try_status(token).unwrap_or_else(|| {
            panic!("slot token {} was never issued or already consumed", token)
        })
    }

    /// Status of a slot, or None if the token is not live
    pub fn try_status(&self, token: Token) -> Option<Status> {
        match &*self.slot(token).lock() {
            Slot::Vacant => None,
            Slot::Pending(_) => Some(Status::Pending),
            Slot::Ready(outcome) => Some(Status::of(Some(outcome))),
        }
    }

    /// Free a slot whatever its state, dropping any unread outcome
    pub fn release(&self, token: Token) {
        let previous = mem::replace(&mut *self.slot(token).lock(), Slot::Vacant);
        drop(previous);
    }

    /// Store a continuation, or give it back if the slot is completed
    pub(crate) fn register_or_return(
        &self,
        token: Token,
        continuation: Continuation
    ) -> Option<Continuation> {
        match &mut *self.slot(token).lock() {
            Slot::Pending(stored) => {
                stored.push(continuation);
                None
            }
            Slot::Ready(_) => Some(continuation),
            Slot::Vacant => {
                panic!("continuation registered on slot token {}, which was \
                        never issued or already consumed", token);
            }
        }
    }

    /// Write the terminal outcome of a slot, then run its continuations
    fn complete(&self,
                token: Token,
                outcome: Result<T, Failure>,
                sink: Option<&dyn ErrorSink>) {
        let failure = outcome.as_ref().err().cloned();
        let continuations = {
            let mut slot = self.slot(token).lock();
            match mem::replace(&mut *slot, Slot::Vacant) {
                Slot::Pending(continuations) => {
                    *slot = Slot::Ready(outcome);
                    continuations
                }
                Slot::Ready(previous) => {
                    *slot = Slot::Ready(previous);
                    panic!("slot token {} completed twice", token);
                }
                Slot::Vacant => {
                    panic!("slot token {} was completed, but was never issued \
                            or already consumed", token);
                }
            }
        };
        if let (Some(sink), Some(failure)) = (sink, failure) {
            sink.report(&failure);
        }
        source::run_continuations(continuations);
    }

    /// Next value of the token counter, wrapping around the token range
    fn next_raw_token(&self) -> u16 {
        let max_token = u32::from(self.max_token);
        loop {
            let raw = self.next_token.fetch_add(1, Ordering::AcqRel);
            if raw <= max_token {
                return raw as u16;
            }

            // Past the end: reset the counter, unless someone already did
            let _guard = self.wrap_lock.lock();
            if self.next_token.load(Ordering::Acquire) > max_token {
                tracing::trace!("slot token counter wrapped around");
                self.next_token.store(u32::from(BASE_TOKEN), Ordering::Release);
            }
        }
    }

    /// Slot of some token
    fn slot(&self, token: Token) -> &Mutex<Slot<T>> {
        usize::from(token.0).checked_sub(usize::from(BASE_TOKEN))
                            .and_then(|index| self.slots.get(index))
                            .unwrap_or_else(|| {
                                panic!("slot token {} does not belong to this \
                                        pool", token)
                            })
    }
}
//
impl<T: Payload> Default for SlotPool<T> {
    fn default() -> Self {
        Self::new()
    }
}
