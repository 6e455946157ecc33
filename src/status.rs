//! Facilities to represent the status of asynchronous results
//!
//! Every asynchronous result handled by this crate follows the same state
//! machine: it starts in a pending state, and is eventually completed exactly
//! once, either successfully with a value or unsuccessfully with a failure.
//! Once a result has reached one of these final states, it won't change
//! anymore.

use crate::error::Failure;


/// Representation of an asynchronous result's status
///
/// Here are the possible state transitions:
///
/// - Pending -> Succeeded / Faulted
///
/// Succeeded and Faulted are final.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// The result has not been produced yet
    Pending,

    /// The result was produced successfully
    Succeeded,

    /// The operation failed, and its failure was captured
    Faulted,
}
//
impl Status {
    /// Status matching a (possibly absent) terminal outcome
    pub fn of<T>(outcome: Option<&Result<T, Failure>>) -> Self {
        match outcome {
            None => Status::Pending,
            Some(Ok(_)) => Status::Succeeded,
            Some(Err(_)) => Status::Faulted,
        }
    }
}


/// Check if a status is final (i.e. won't change anymore)
pub fn is_final(s: Status) -> bool {
    match s {
        Status::Pending => false,
        Status::Succeeded | Status::Faulted => true,
    }
}


/// Trait bounds which every asynchronous result value should honor
///
/// Values are cloned out of completed results, since many readers may observe
/// the same result, and they may be produced and consumed on different
/// threads.
///
pub trait Payload: Clone + Send + Sync + 'static {}
//
impl<T: Clone + Send + Sync + 'static> Payload for T {}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    /// Test that statuses are derived correctly from outcomes
    #[test]
    fn status_of_outcome() {
        assert_eq!(Status::of::<u8>(None), Status::Pending);
        assert!(!is_final(Status::Pending));

        let done: Result<u8, Failure> = Ok(42);
        assert_eq!(Status::of(Some(&done)), Status::Succeeded);
        assert!(is_final(Status::Succeeded));

        let failed: Result<u8, Failure> = Err(Failure::msg("nope"));
        assert_eq!(Status::of(Some(&failed)), Status::Faulted);
        assert!(is_final(Status::Faulted));
    }
}
