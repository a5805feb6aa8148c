//! Event registry errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("Listener is not registered on this event")]
    ListenerNotFound,
}

pub type EventResult<T> = Result<T, EventError>;

/// A single listener failure collected by [`crate::AsyncEvent::ginvoke`]
#[derive(Debug)]
pub struct ListenerFailure<E> {
    /// Position of the listener in registration order
    pub index: usize,
    pub error: E,
}

/// Returned by `ginvoke` when at least one listener failed.
///
/// Every failure is kept, ordered by listener index. Results from listeners
/// that succeeded are dropped.
#[derive(Debug, Error)]
#[error("{} of {} listeners failed", .failures.len(), .listener_count)]
pub struct GatherError<E> {
    pub failures: Vec<ListenerFailure<E>>,
    pub listener_count: usize,
}

impl<E> GatherError<E> {
    /// Failure of the earliest registered listener that failed
    pub fn first(&self) -> Option<&E> {
        self.failures.first().map(|f| &f.error)
    }

    pub fn into_errors(self) -> Vec<E> {
        self.failures.into_iter().map(|f| f.error).collect()
    }
}
