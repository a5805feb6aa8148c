//! Synchronous events

use std::sync::Arc;

use crate::error::EventResult;
use crate::registry::ListenerList;

/// Handle to a registered synchronous listener
pub type SyncListener<A, T, E> = Arc<dyn Fn(A) -> Result<T, E> + Send + Sync>;

/// Event whose listeners are plain functions.
pub struct SyncEvent<A, T, E> {
    listeners: ListenerList<dyn Fn(A) -> Result<T, E> + Send + Sync>,
}

impl<A, T, E> Default for SyncEvent<A, T, E> {
    fn default() -> Self {
        Self {
            listeners: ListenerList::new(),
        }
    }
}

impl<A, T, E> Clone for SyncEvent<A, T, E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<A, T, E> std::fmt::Debug for SyncEvent<A, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEvent")
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}

impl<A, T, E> SyncEvent<A, T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: SyncListener<A, T, E>) {
        self.listeners.register(listener);
    }

    pub fn unregister(&mut self, listener: &SyncListener<A, T, E>) -> EventResult<()> {
        self.listeners.unregister(listener)
    }

    /// Register a closure and return its handle for later `unregister`.
    pub fn listen<F>(&mut self, f: F) -> SyncListener<A, T, E>
    where
        F: Fn(A) -> Result<T, E> + Send + Sync + 'static,
    {
        let listener: SyncListener<A, T, E> = Arc::new(f);
        self.register(listener.clone());
        listener
    }

    pub fn has_listener(&self) -> bool {
        self.listeners.has_listener()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<A: Clone, T, E> SyncEvent<A, T, E> {
    /// Call every listener in registration order.
    ///
    /// Stops at the first failing listener; later listeners are not called.
    pub fn invoke(&self, args: A) -> Result<Vec<T>, E> {
        tracing::trace!(
            listener_count = self.listeners.len(),
            "Invoking sync event"
        );
        let mut results = Vec::with_capacity(self.listeners.len());
        for listener in self.listeners.iter() {
            results.push(listener(args.clone())?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_invoke_collects_results_in_registration_order() {
        let mut event: SyncEvent<i32, i32, String> = SyncEvent::new();
        event.listen(|x| Ok(x + 1));
        event.listen(|x| Ok(x * 10));
        event.listen(|x| Ok(x - 1));

        assert_eq!(event.invoke(5).unwrap(), vec![6, 50, 4]);
    }

    #[test]
    fn test_invoke_without_listeners_returns_empty() {
        let event: SyncEvent<(), (), String> = SyncEvent::new();
        assert!(!event.has_listener());
        assert!(event.invoke(()).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_registration_is_called_twice() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut event: SyncEvent<(), (), String> = SyncEvent::new();

        let counter = calls.clone();
        let listener = event.listen(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        event.register(listener.clone());

        event.invoke(()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        event.unregister(&listener).unwrap();
        event.invoke(()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_first_failure_stops_invocation() {
        let later_calls = Arc::new(AtomicUsize::new(0));
        let mut event: SyncEvent<&'static str, usize, String> = SyncEvent::new();

        event.listen(|s| Ok(s.len()));
        event.listen(|s| Err(format!("rejected {s}")));
        event.listen(|_| Err("second failure".to_string()));
        let counter = later_calls.clone();
        event.listen(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        });

        let err = event.invoke("payload").unwrap_err();
        assert_eq!(err, "rejected payload");
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unregistered_listener_is_not_called() {
        let mut event: SyncEvent<u8, u8, String> = SyncEvent::new();
        let doubled = event.listen(|x| Ok(x * 2));
        event.listen(|x| Ok(x));

        event.unregister(&doubled).unwrap();
        assert_eq!(event.invoke(3).unwrap(), vec![3]);
        assert!(event.unregister(&doubled).is_err());
    }
}
