//! Error sinks
//!
//! Failures of asynchronous operations are never rethrown to the readers of
//! their result. Instead, each failure is handed exactly once to an error
//! sink, which is the place where an application decides what to do about
//! it (log it, count it, abort...).

use crate::error::Failure;


/// Destination of every suppressed failure
pub trait ErrorSink: Send + Sync {
    /// Handle a failure which is being suppressed
    fn report(&self, failure: &Failure);
}
//
impl<F> ErrorSink for F
    where F: Fn(&Failure) + Send + Sync
{
    fn report(&self, failure: &Failure) {
        self(failure)
    }
}


/// Error sink which emits suppressed failures as `tracing` error events
///
/// This is the sink used when the application did not configure one.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;
//
impl ErrorSink for TracingSink {
    fn report(&self, failure: &Failure) {
        tracing::error!(error = %failure, "suppressed asynchronous failure");
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{init_test_logging, CountingSink};

    /// Check that closures can be used as sinks
    #[test]
    fn closure_sink() {
        let sink = CountingSink::new();
        let shared = sink.clone();
        let closure = move |failure: &Failure| shared.report(failure);
        closure.report(&Failure::msg("first"));
        closure.report(&Failure::msg("second"));
        assert_eq!(sink.count(), 2);
        assert_eq!(sink.messages(), vec!["first", "second"]);
    }

    /// Check that the tracing sink does not choke on failures
    #[test]
    fn tracing_sink() {
        init_test_logging();
        TracingSink.report(&Failure::msg("logged"));
    }
}
