//! Asynchronous results which never throw
//!
//! Picture yourself delegating work to some other entity, be it a thread, a
//! state machine stepped by an event loop, or a device driver. You want a
//! handle on the result of that work, which you can poll, block on, or await,
//! and you would rather not have every reader deal with the ways in which the
//! work may fail: failures should be dealt with in one place, and readers
//! should just learn that no value is coming.
//!
//! This crate provides such a handle, the `ResultFuture`. Its producer
//! completes it exactly once, with a value or a failure. Failures go to the
//! error sink of the crate configuration, and readers get a `Response`, which
//! is simply invalid when the work failed. Result futures can be read by
//! blocking, by suspending on them through an `Awaiter` (which is also a
//! standard `Future`), or through a `Bridge`, a standard future which may be
//! configured to propagate failures for interoperability purposes.
//!
//! The completion mechanism behind a result future is pluggable. Besides the
//! default lock-free completion state and a simpler mutex-based one, a result
//! future may be a mere token into a `SlotPool`, a table of reusable
//! completion slots which avoids allocating a synchronization object per
//! result.
//!
//! Finally, a `Driver` glues a result future to the external mechanism which
//! steps the computation producing its result.

pub mod awaiter;
pub mod bridge;
pub mod config;
pub mod driver;
pub mod error;
pub mod future;
pub mod pool;
pub mod response;
pub mod sink;
pub mod source;
pub mod status;

#[cfg(test)]
mod test_utils;

pub use awaiter::{Awaitable, Awaiter};
pub use bridge::{gather, gather_valid, suppress_future, Bridge};
pub use config::{suppress, BackendKind, BridgePolicy, Config};
pub use driver::{Driver, DriverMonitor, DriverState};
pub use error::{BridgeError, ConfigError, DriverError, Failure, PoolError};
pub use future::ResultFuture;
pub use pool::{SlotPool, Token};
pub use response::Response;
pub use sink::{ErrorSink, TracingSink};
pub use source::{CompletionSource, Continuation};
pub use status::{Payload, Status};
