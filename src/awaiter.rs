//! Suspension points
//!
//! External schedulers suspend on an asynchronous result through a minimal
//! protocol: check whether it is ready, if not register a continuation and
//! yield, and once resumed fetch the result. The `Awaiter` exposes this
//! protocol for a `ResultFuture`, and also implements the standard `Future`
//! trait on top of it, so that result futures can be `.await`ed.
//!
//! Continuations run on whichever thread completes the result, as part of the
//! completion. They must be ready to run on any thread, and must not block on
//! the result that they are a continuation of.
//!
//! Any number of awaiters may suspend on the same result. Each of them is
//! resumed exactly once.

use crate::future::ResultFuture;
use crate::response::Response;
use crate::status::Payload;
use futures::task::AtomicWaker;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};


/// Something which external schedulers can suspend on
pub trait Awaitable {
    /// Truth that suspending is unnecessary (non-blocking)
    fn is_ready(&self) -> bool;

    /// Schedule `continuation` to be run exactly once, upon completion
    ///
    /// If completion has already happened, the continuation runs immediately
    /// on the calling thread. Registrations made while pending are all kept,
    /// and run in registration order.
    ///
    fn on_suspend<F>(&self, continuation: F)
        where F: FnOnce() + Send + 'static;
}


/// Suspension point adapter of a `ResultFuture`
pub struct Awaiter<T: Payload> {
    future: ResultFuture<T>,

    /// Waker of the task polling this awaiter, updated on every poll
    waker: Arc<AtomicWaker>,

    /// Truth that a continuation waking `waker` was registered
    registered: AtomicBool,
}
//
impl<T: Payload> Awaiter<T> {
    /// Wrap a result future
    pub fn new(future: ResultFuture<T>) -> Self {
        Awaiter {
            future,
            waker: Arc::new(AtomicWaker::new()),
            registered: AtomicBool::new(false),
        }
    }

    /// Fetch the response, blocking if the future is not completed yet
    ///
    /// This is safe to call whether or not the caller suspended first: both
    /// paths end up reading the same terminal response.
    ///
    pub fn get_result(&self) -> Response<T> {
        self.future.get_value()
    }

    /// Result future being awaited
    pub fn future(&self) -> &ResultFuture<T> {
        &self.future
    }
}
//
impl<T: Payload> Clone for Awaiter<T> {
    /// Clones may be polled by other tasks, so they get their own waker
    fn clone(&self) -> Self {
        Awaiter::new(self.future.clone())
    }
}
//
impl<T: Payload> Awaitable for Awaiter<T> {
    fn is_ready(&self) -> bool {
        self.future.is_completed()
    }

    fn on_suspend<F>(&self, continuation: F)
        where F: FnOnce() + Send + 'static
    {
        self.future.on_suspend(continuation);
    }
}
//
impl<T: Payload> Future for Awaiter<T> {
    type Output = Response<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Response<T>> {
        if let Some(response) = self.future.try_get_value() {
            return Poll::Ready(response);
        }

        // Later polls only update the waker, the continuation stays
        self.waker.register(cx.waker());
        if !self.registered.swap(true, Ordering::AcqRel) {
            let waker = self.waker.clone();
            self.future.on_suspend(move || waker.wake());
        }

        // Completion may have happened in between
        match self.future.try_get_value() {
            Some(response) => Poll::Ready(response),
            None => Poll::Pending,
        }
    }
}
//
impl<T: Payload> IntoFuture for ResultFuture<T> {
    type Output = Response<T>;
    type IntoFuture = Awaiter<T>;

    fn into_future(self) -> Awaiter<T> {
        Awaiter::new(self)
    }
}
