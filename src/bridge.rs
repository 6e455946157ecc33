//! Interoperability with standard futures
//!
//! A `Bridge` is a standard future which resolves with the response of a
//! `ResultFuture`. It is clonable, every clone resolves with the same
//! response, and it does not rely on the result future's continuation, so it
//! can be polled alongside an `Awaiter`.
//!
//! Whether a failure comes out of a bridge as an invalid response or as the
//! captured failure is decided by the `BridgePolicy` of the configuration
//! which the result future was created under.
//!
//! This module also provides the conversions going the other way, from
//! standard futures which may fail to futures of responses, and a combinator
//! which gathers many result futures without letting any failure abort the
//! group.

use crate::config::{BridgePolicy, Config};
use crate::error::{BridgeError, Failure};
use crate::future::ResultFuture;
use crate::response::Response;
use crate::status::Payload;
use futures::channel::oneshot;
use futures::future::{join_all, FutureExt, Shared};
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::task::{Context, Poll};


/// Output of a bridged future
pub type BridgeOutput<T> = Result<Response<T>, Failure>;


/// Standard future resolving with the response of a `ResultFuture`
#[derive(Clone)]
pub struct Bridge<T: Payload> {
    /// Outcome, sent once by the result future
    outcome: Shared<oneshot::Receiver<Result<T, Failure>>>,

    /// What to do with failures
    policy: BridgePolicy,
}
//
impl<T: Payload> Bridge<T> {
    /// Bridge resolved by the sending side of some channel
    pub(crate) fn new(receiver: oneshot::Receiver<Result<T, Failure>>,
                      policy: BridgePolicy) -> Self {
        Bridge { outcome: receiver.shared(), policy }
    }

    /// Failure behaviour of this bridge
    pub fn policy(&self) -> BridgePolicy {
        self.policy
    }

    /// Truth that two bridges are clones of the same bridge
    ///
    /// Bridges which were polled to completion are not comparable anymore,
    /// and compare unequal to everything.
    ///
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Shared::ptr_eq(&self.outcome, &other.outcome)
    }
}
//
impl<T: Payload> Future for Bridge<T> {
    type Output = BridgeOutput<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>)
        -> Poll<BridgeOutput<T>>
    {
        let policy = self.policy;
        let outcome = futures::ready!(self.outcome.poll_unpin(cx));
        Poll::Ready(match outcome {
            Ok(Ok(value)) => Ok(Response::valid(value)),
            Ok(Err(failure)) => match policy {
                BridgePolicy::Suppress => Ok(Response::invalid()),
                BridgePolicy::Propagate => Err(failure),
            },
            Err(oneshot::Canceled) => match policy {
                BridgePolicy::Suppress => Ok(Response::invalid()),
                BridgePolicy::Propagate => {
                    Err(Failure::new(BridgeError::SourceDropped))
                }
            },
        })
    }
}
//
impl<T: Payload> From<ResultFuture<T>> for Bridge<T> {
    fn from(future: ResultFuture<T>) -> Self {
        future.bridge()
    }
}


/// Turn a fallible standard future into a future of responses, reporting
/// its failure to the process-wide error sink
pub async fn suppress_future<F, T, E>(future: F) -> Response<T>
    where F: Future<Output = Result<T, E>>,
          E: Into<Failure>
{
    Config::global().suppress(future.await)
}


/// Turn a fallible standard future into a future of responses, reporting
/// its failure to the error sink of some configuration
pub async fn suppress_future_with<F, T, E>(future: F,
                                           config: Config) -> Response<T>
    where F: Future<Output = Result<T, E>>,
          E: Into<Failure>
{
    config.suppress(future.await)
}


/// Await every future of a collection, keeping each response
///
/// Responses come out in the order of the input collection. Failed futures
/// give invalid responses, and do not prevent the others from completing.
///
pub async fn gather<T, I>(futures: I) -> Vec<Response<T>>
    where T: Payload,
          I: IntoIterator<Item = ResultFuture<T>>
{
    join_all(futures.into_iter().map(IntoFuture::into_future)).await
}


/// Await every future of a collection, keeping only successful values
pub async fn gather_valid<T, I>(futures: I) -> Vec<T>
    where T: Payload,
          I: IntoIterator<Item = ResultFuture<T>>
{
    gather(futures).await
                   .into_iter()
                   .filter_map(Response::into_value)
                   .collect()
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;
    use crate::test_utils::CountingSink;
    use futures::executor::block_on;
    use proptest::prelude::*;
    use std::thread;

    /// Check the conversion from result futures
    #[test]
    fn conversion() {
        let future = ResultFuture::completed(3u64);
        let bridge: Bridge<u64> = future.clone().into();
        assert!(bridge.ptr_eq(&future.bridge()));
        assert_eq!(bridge.policy(), BridgePolicy::Suppress);
        assert_eq!(block_on(bridge), Ok(Response::valid(3)));
    }

    /// Check that bridges can be awaited alongside the awaiter
    #[test]
    fn bridge_and_awaiter() {
        let future = ResultFuture::<u8>::pending();
        let bridge = future.bridge();
        let producer_future = future.clone();
        let producer = thread::spawn(move || producer_future.set_value(6));
        let (direct, bridged) = block_on(async {
            futures::join!(future.into_future(), bridge)
        });
        producer.join().unwrap();
        assert_eq!(direct, Response::valid(6));
        assert_eq!(bridged, Ok(Response::valid(6)));
    }

    /// Check the suppression of fallible standard futures
    #[test]
    fn suppressed_futures() {
        let sink = CountingSink::new();
        let ok = async { Ok::<_, DriverError>(1u8) };
        let err = async { Err::<u8, _>(DriverError::Abandoned) };
        let responses = block_on(async {
            (suppress_future_with(ok, sink.config()).await,
             suppress_future_with(err, sink.config()).await)
        });
        assert_eq!(responses, (Response::valid(1), Response::invalid()));
        assert_eq!(sink.count(), 1);

        let global = block_on(suppress_future(async { Ok::<_, Failure>(2) }));
        assert_eq!(global, Response::valid(2));
    }

    /// Check that gathering keeps the input order
    #[test]
    fn gather_order() {
        let sink = CountingSink::new();
        let config = sink.config();
        let futures = vec![
            ResultFuture::completed_with(1, &config),
            ResultFuture::failed_with(Failure::msg("two"), &config),
            ResultFuture::completed_with(3, &config),
        ];
        assert_eq!(block_on(gather(futures.clone())),
                   vec![Response::valid(1), Response::invalid(),
                        Response::valid(3)]);
        assert_eq!(block_on(gather_valid(futures)), vec![1, 3]);
        assert!(block_on(gather(Vec::<ResultFuture<u8>>::new())).is_empty());
    }

    proptest! {
        /// Gathering N futures of which k fail yields N - k valid responses,
        /// whatever the completion order
        #[test]
        fn gather_validity(outcomes in prop::collection::vec(any::<bool>(),
                                                             0..24),
                           reverse in any::<bool>()) {
            let sink = CountingSink::new();
            let config = sink.config();
            let futures = outcomes.iter()
                                  .map(|_| ResultFuture::pending_with(&config))
                                  .collect::<Vec<ResultFuture<usize>>>();

            // Complete the futures from another thread, in some order
            let mut order = futures.iter()
                                   .cloned()
                                   .zip(outcomes.iter().cloned())
                                   .enumerate()
                                   .collect::<Vec<_>>();
            if reverse {
                order.reverse();
            }
            let producer = thread::spawn(move || {
                for (index, (future, success)) in order {
                    if success {
                        future.set_value(index);
                    } else {
                        future.set_error(Failure::msg("failed"));
                    }
                }
            });

            let responses = block_on(gather(futures));
            producer.join().unwrap();

            let successes = outcomes.iter().filter(|&&ok| ok).count();
            let valid = responses.iter().filter(|r| r.is_valid()).count();
            prop_assert_eq!(valid, successes);
            prop_assert_eq!(sink.count(), outcomes.len() - successes);
            for (index, response) in responses.into_iter().enumerate() {
                if let Some(value) = response.value() {
                    prop_assert_eq!(*value, index);
                }
            }
        }
    }
}
