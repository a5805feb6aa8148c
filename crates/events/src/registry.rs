//! Ordered listener storage shared by the sync and async events

use std::sync::Arc;

use crate::error::{EventError, EventResult};

/// Listener handles in registration order.
///
/// Identity is the `Arc` allocation, so two handles created from the same
/// closure body are still distinct listeners.
pub struct ListenerList<L: ?Sized> {
    listeners: Vec<Arc<L>>,
}

impl<L: ?Sized> Default for ListenerList<L> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }
}

impl<L: ?Sized> Clone for ListenerList<L> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<L: ?Sized> std::fmt::Debug for ListenerList<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerList")
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}

impl<L: ?Sized> ListenerList<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, listener: Arc<L>) {
        self.listeners.push(listener);
    }

    /// Remove the first registration of `listener`.
    pub fn unregister(&mut self, listener: &Arc<L>) -> EventResult<()> {
        let position = self
            .listeners
            .iter()
            .position(|registered| Arc::ptr_eq(registered, listener))
            .ok_or(EventError::ListenerNotFound)?;
        self.listeners.remove(position);
        Ok(())
    }

    pub fn has_listener(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<L>> {
        self.listeners.iter()
    }
}
