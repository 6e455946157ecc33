//! Drivers of externally stepped computations
//!
//! A driver is the glue between a `ResultFuture` and whatever steps the
//! computation which produces its result: an explicit state machine, a chain
//! of callbacks, or a language-level async construct. The stepping mechanism
//! calls into the driver at well-defined points:
//!
//! - `start()` runs the first step, synchronously
//! - `on_suspend()` parks the computation on an inner awaitable, and arranges
//!   for it to resume on the same driver once the awaitable completes
//! - `finish_with_value()` or `finish_with_error()` writes the outcome
//!
//! Drivers follow a simple state machine:
//!
//! - Created -> Running -> Completed / Failed
//! - Created -> Completed / Failed
//!
//! Completed and Failed are final. Exactly one terminal call is allowed per
//! driver; a second one is a programmer error which panics.
//!
//! If every handle to a driver is dropped before it reached a final state,
//! its future fails with `DriverError::Abandoned`, so that readers of the
//! future don't hang forever.

pub mod monitor;

use crate::awaiter::Awaitable;
use crate::config::Config;
use crate::error::{DriverError, Failure};
use crate::future::ResultFuture;
use crate::status::{Payload, Status};
use parking_lot::Mutex;
use std::sync::Arc;
use triple_buffer::{Input, TripleBuffer};

pub use self::monitor::DriverMonitor;


/// State of a driver
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DriverState {
    /// The future exists, but no step ran yet
    Created,

    /// Steps are being run
    Running,

    /// The future was completed with a value
    Completed,

    /// The future was completed with a failure
    Failed,
}


/// Check if a driver state is final (i.e. won't change anymore)
pub fn is_final(state: DriverState) -> bool {
    match state {
        DriverState::Created | DriverState::Running => false,
        DriverState::Completed | DriverState::Failed => true,
    }
}


/// Handle to a driver, which can be cloned into continuations
pub struct Driver<T: Payload> {
    shared: Arc<DriverShared<T>>,
}
//
struct DriverShared<T: Payload> {
    /// Future being driven
    future: ResultFuture<T>,

    /// Current state (mutex-protected)
    core: Mutex<DriverCore>,
}
//
struct DriverCore {
    /// Current state
    state: DriverState,

    /// Publication channel of state updates, if monitored
    monitor: Option<Input<DriverState>>,
}
//
impl<T: Payload> Driver<T> {
    /// Create a driver and its pending future, under the process-wide
    /// configuration
    pub fn create() -> Self {
        Self::create_with(Config::global())
    }

    /// Create a driver and its pending future, under some configuration
    pub fn create_with(config: &Config) -> Self {
        Self::build(config, None)
    }

    /// Create a driver along with a monitor of its state
    pub fn create_monitored() -> (Self, DriverMonitor) {
        Self::create_monitored_with(Config::global())
    }

    /// Create a driver along with a monitor of its state, under some
    /// configuration
    pub fn create_monitored_with(config: &Config) -> (Self, DriverMonitor) {
        let (input, output) = TripleBuffer::new(&DriverState::Created).split();
        (Self::build(config, Some(input)), DriverMonitor::new(output))
    }

    /// Future being driven
    pub fn future(&self) -> ResultFuture<T> {
        self.shared.future.clone()
    }

    /// Current state
    pub fn state(&self) -> DriverState {
        self.shared.core.lock().state
    }

    /// Run the first step of the computation, on the calling thread
    pub fn start<F>(&self, step: F)
        where F: FnOnce(&Driver<T>)
    {
        self.enter(DriverState::Running);
        step(self);
    }

    /// Suspend the computation on `inner`, to be continued by `continue_fn`
    ///
    /// Control returns to the caller right away. Once `inner` completes,
    /// `continue_fn` is run with a handle to this driver, on the completing
    /// thread, or immediately if `inner` is completed already.
    ///
    pub fn on_suspend<A, F>(&self, inner: &A, continue_fn: F)
        where A: Awaitable,
              F: FnOnce(Driver<T>) + Send + 'static
    {
        let driver = self.clone();
        inner.on_suspend(move || continue_fn(driver));
    }

    /// Complete the computation with a value
    pub fn finish_with_value(&self, value: T) {
        self.enter(DriverState::Completed);
        self.shared.future.set_value(value);
    }

    /// Complete the computation with a failure, which gets reported
    pub fn finish_with_error(&self, error: impl Into<Failure>) {
        self.enter(DriverState::Failed);
        self.shared.future.set_error(error);
    }

    /// Build a driver around a new pending future
    fn build(config: &Config, monitor: Option<Input<DriverState>>) -> Self {
        Driver {
            shared: Arc::new(DriverShared {
                future: ResultFuture::pending_with(config),
                core: Mutex::new(DriverCore { state: DriverState::Created,
                                              monitor }),
            }),
        }
    }

    /// Move to a new state, failing fast on invalid transitions
    fn enter(&self, next: DriverState) {
        self.shared.core.lock().enter(next);
    }
}
//
impl<T: Payload> Clone for Driver<T> {
    fn clone(&self) -> Self {
        Driver { shared: self.shared.clone() }
    }
}
//
impl<T: Payload> Drop for DriverShared<T> {
    /// If the driver is dropped before the computation has reached a final
    /// state, fail the future in order to prevent readers from hanging
    fn drop(&mut self) {
        let core = self.core.get_mut();
        if is_final(core.state) {
            return;
        }

        // Someone may have completed the future behind the driver's back
        match self.future.status() {
            Status::Pending => {
                core.enter(DriverState::Failed);
                self.future.set_error(DriverError::Abandoned);
            }
            Status::Succeeded => core.enter(DriverState::Completed),
            Status::Faulted => core.enter(DriverState::Failed),
        }
    }
}
//
impl DriverCore {
    /// Move to a new state, and publish it
    fn enter(&mut self, next: DriverState) {
        let allowed = match next {
            DriverState::Created => false,
            DriverState::Running => self.state == DriverState::Created,
            DriverState::Completed | DriverState::Failed => !is_final(self.state),
        };
        if !allowed {
            panic!("driver cannot move from {:?} to {:?}", self.state, next);
        }

        tracing::debug!(from = ?self.state, to = ?next, "driver transition");
        self.state = next;
        if let Some(monitor) = self.monitor.as_mut() {
            monitor.write(next);
        }
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;
    use crate::test_utils::{init_test_logging, CountingSink};
    use std::future::IntoFuture;
    use std::thread;
    use std::time::Duration;

    /// Check the initial state of drivers
    #[test]
    fn initial_state() {
        let driver = Driver::<u8>::create();
        assert_eq!(driver.state(), DriverState::Created);
        assert!(!driver.future().is_completed());
    }

    /// Check that the first step runs synchronously
    #[test]
    fn synchronous_start() {
        init_test_logging();
        let driver = Driver::<u32>::create();
        let mut ran = false;
        driver.start(|d| {
            assert_eq!(d.state(), DriverState::Running);
            ran = true;
            d.finish_with_value(10);
        });
        assert!(ran);
        assert_eq!(driver.state(), DriverState::Completed);
        assert_eq!(driver.future().get_value(), Response::valid(10));
    }

    /// Check a computation which suspends on an inner future, and gets
    /// resumed on another thread
    #[test]
    fn suspension() {
        let (driver, mut monitor) = Driver::<String>::create_monitored();
        let inner = ResultFuture::<u32>::pending();
        let outer = driver.future();

        let c_inner = inner.clone();
        driver.start(move |d| {
            let awaited = c_inner.clone();
            d.on_suspend(&awaited, move |resumed| {
                let value = c_inner.get_value();
                match value.into_value() {
                    Some(v) => resumed.finish_with_value(format!("got {}", v)),
                    None => resumed.finish_with_error(
                        Failure::msg("inner failed")
                    ),
                }
            });
        });
        assert_eq!(monitor.state(), DriverState::Running);
        drop(driver);

        // Completing the inner future resumes the driver
        let producer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            inner.set_value(5);
        });
        assert_eq!(outer.get_value(), Response::valid("got 5".to_owned()));
        producer.join().unwrap();
        assert_eq!(monitor.state(), DriverState::Completed);
    }

    /// Check that failures are reported once and tracked by the state
    #[test]
    fn failure() {
        let sink = CountingSink::new();
        let (driver, mut monitor) =
            Driver::<u8>::create_monitored_with(&sink.config());
        driver.start(|d| d.finish_with_error(Failure::msg("step failed")));
        assert_eq!(driver.state(), DriverState::Failed);
        assert_eq!(monitor.state(), DriverState::Failed);
        assert_eq!(driver.future().get_value(), Response::invalid());
        assert_eq!(sink.messages(), vec!["step failed"]);
    }

    /// Check that drivers can finish without running any step
    #[test]
    fn immediate_finish() {
        let driver = Driver::<u8>::create();
        driver.finish_with_value(1);
        assert_eq!(driver.state(), DriverState::Completed);
    }

    /// Check that a second terminal call fails fast
    #[test]
    #[should_panic(expected = "driver cannot move from Completed to Failed")]
    fn double_finish() {
        let driver = Driver::<u8>::create();
        driver.start(|d| d.finish_with_value(1));
        driver.finish_with_error(Failure::msg("too late"));
    }

    /// Check that drivers cannot be started twice
    #[test]
    #[should_panic(expected = "driver cannot move from Running to Running")]
    fn double_start() {
        let driver = Driver::<u8>::create();
        driver.start(|_| {});
        driver.start(|_| {});
    }

    /// Check that abandoned drivers fail their future
    #[test]
    fn abandonment() {
        let sink = CountingSink::new();
        let (driver, mut monitor) =
            Driver::<u8>::create_monitored_with(&sink.config());
        let future = driver.future();
        driver.start(|_| {});
        drop(driver);

        assert_eq!(future.get_value(), Response::invalid());
        assert_eq!(monitor.state(), DriverState::Failed);
        let failures = sink.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].downcast_ref::<DriverError>(),
                   Some(&DriverError::Abandoned));
    }

    /// Check that dropping a driver whose future was completed directly
    /// neither panics nor reports anything
    #[test]
    fn future_completed_elsewhere() {
        let sink = CountingSink::new();
        let (driver, mut monitor) =
            Driver::<u8>::create_monitored_with(&sink.config());
        let future = driver.future();
        driver.start(|_| {});
        future.set_value(4);
        drop(driver);

        assert_eq!(future.get_value(), Response::valid(4));
        assert_eq!(monitor.state(), DriverState::Completed);
        assert_eq!(sink.count(), 0);
    }

    /// Check that awaiting the inner future of a suspended driver does not
    /// cancel the driver's resumption
    #[test]
    fn suspension_alongside_await() {
        let sink = CountingSink::new();
        let driver = Driver::<u32>::create_with(&sink.config());
        let inner = ResultFuture::<u32>::pending();
        let outer = driver.future();

        let c_inner = inner.clone();
        driver.start(move |d| {
            let awaited = c_inner.clone();
            d.on_suspend(&awaited, move |resumed| {
                let doubled = c_inner.get_value().map(|v| v * 2);
                resumed.finish_with_value(doubled.unwrap_or(0));
            });
        });
        drop(driver);

        let awaiter_inner = inner.clone();
        let waiter = thread::spawn(move || {
            futures::executor::block_on(awaiter_inner.into_future())
        });
        thread::sleep(Duration::from_millis(10));
        inner.set_value(21);

        assert_eq!(waiter.join().unwrap(), Response::valid(21));
        assert_eq!(outer.get_value(), Response::valid(42));
        assert_eq!(sink.count(), 0);
    }

    /// Check that finished drivers are dropped silently
    #[test]
    fn clean_drop() {
        let sink = CountingSink::new();
        let driver = Driver::<u8>::create_with(&sink.config());
        driver.finish_with_value(2);
        drop(driver);
        assert_eq!(sink.count(), 0);
    }
}
