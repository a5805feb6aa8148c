//! Asynchronous events

use std::future::Future;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};

use crate::error::{EventResult, GatherError, ListenerFailure};
use crate::registry::ListenerList;

/// Handle to a registered asynchronous listener
pub type AsyncListener<A, T, E> = Arc<dyn Fn(A) -> BoxFuture<'static, Result<T, E>> + Send + Sync>;

/// Event whose listeners return futures.
pub struct AsyncEvent<A, T, E> {
    listeners: ListenerList<dyn Fn(A) -> BoxFuture<'static, Result<T, E>> + Send + Sync>,
}

impl<A, T, E> Default for AsyncEvent<A, T, E> {
    fn default() -> Self {
        Self {
            listeners: ListenerList::new(),
        }
    }
}

impl<A, T, E> Clone for AsyncEvent<A, T, E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<A, T, E> std::fmt::Debug for AsyncEvent<A, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncEvent")
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}

impl<A, T, E> AsyncEvent<A, T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: AsyncListener<A, T, E>) {
        self.listeners.register(listener);
    }

    pub fn unregister(&mut self, listener: &AsyncListener<A, T, E>) -> EventResult<()> {
        self.listeners.unregister(listener)
    }

    /// Register an async closure and return its handle for later `unregister`.
    pub fn listen<F, Fut>(&mut self, f: F) -> AsyncListener<A, T, E>
    where
        A: 'static,
        T: 'static,
        E: 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let listener: AsyncListener<A, T, E> =
            Arc::new(move |args: A| -> BoxFuture<'static, Result<T, E>> { Box::pin(f(args)) });
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

impl<A: Clone, T, E> AsyncEvent<A, T, E> {
    /// Await each listener in registration order before calling the next.
    ///
    /// Stops at the first failing listener.
    pub async fn ainvoke(&self, args: A) -> Result<Vec<T>, E> {
        tracing::trace!(
            listener_count = self.listeners.len(),
            "Invoking async event sequentially"
        );
        let mut results = Vec::with_capacity(self.listeners.len());
        for listener in self.listeners.iter() {
            results.push(listener(args.clone()).await?);
        }
        Ok(results)
    }

    /// Run every listener concurrently on the current task and wait for all of them.
    ///
    /// A failing listener does not cancel the others. Results come back in
    /// registration order; if any listener failed, all failures are returned
    /// instead.
    pub async fn ginvoke(&self, args: A) -> Result<Vec<T>, GatherError<E>> {
        let listener_count = self.listeners.len();
        tracing::trace!(listener_count, "Invoking async event concurrently");

        let outcomes = join_all(self.listeners.iter().map(|listener| listener(args.clone()))).await;

        let mut results = Vec::with_capacity(listener_count);
        let mut failures = Vec::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(value) => results.push(value),
                Err(error) => failures.push(ListenerFailure { index, error }),
            }
        }

        if failures.is_empty() {
            Ok(results)
        } else {
            tracing::debug!(
                failed = failures.len(),
                listener_count,
                "Concurrent event invocation had failing listeners"
            );
            Err(GatherError {
                failures,
                listener_count,
            })
        }
    }
}
