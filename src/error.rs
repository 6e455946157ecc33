//! Failures and crate-level errors
//!
//! Two kinds of errors flow through this crate. User failures, produced by
//! whatever work an asynchronous operation performs, are captured as a
//! type-erased `Failure` so that they can be handed to the error sink, kept in
//! a pool slot and handed back by a bridge without knowing their type. The
//! crate's own error conditions are regular enums.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;


/// A captured failure of an asynchronous operation
///
/// Cloning a failure is cheap and every clone refers to the same underlying
/// error, so the sink, the bridge and a pool slot can all hold the same one.
///
#[derive(Clone)]
pub struct Failure(Arc<dyn StdError + Send + Sync + 'static>);
//
impl Failure {
    /// Capture an error
    pub fn new<E>(error: E) -> Self
        where E: StdError + Send + Sync + 'static
    {
        Failure(Arc::new(error))
    }

    /// Capture a plain error message
    pub fn msg(message: impl Into<String>) -> Self {
        Failure(Arc::new(Message(message.into())))
    }

    /// Access the underlying error
    pub fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }

    /// Attempt to access the underlying error as a concrete type
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    /// Check whether two failures are clones of the same capture
    pub fn ptr_eq(&self, other: &Failure) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
//
impl<E> From<E> for Failure
    where E: StdError + Send + Sync + 'static
{
    fn from(error: E) -> Self {
        Failure::new(error)
    }
}
//
impl PartialEq for Failure {
    /// Failures are equal when they are clones of the same capture
    fn eq(&self, other: &Failure) -> bool {
        self.ptr_eq(other)
    }
}
//
impl fmt::Debug for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}
//
impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}


/// Error built by `Failure::msg()`
#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);


/// Errors of the token-indexed slot pool
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Every token of the pool is held by a live slot
    #[error("all {capacity} slot tokens are held by unconsumed results")]
    Exhausted { capacity: u16 },
}


/// Errors reported on behalf of a driver
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DriverError {
    /// The driver was dropped before reaching a terminal state
    #[error("driver dropped before reaching a terminal state")]
    Abandoned,
}


/// Errors surfaced by bridged futures
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// Every handle to the source future was dropped while it was pending
    #[error("result future dropped before completion")]
    SourceDropped,
}


/// Errors of the process-wide configuration
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration was installed already
    #[error("the process-wide configuration was already installed")]
    AlreadyInstalled,
}
