//! # void_event - Synchronous Multicast Events
//!
//! Change notification for the property runtime:
//! - Priority-ordered handler delivery
//! - Typed and slice arguments (`Event<[Any]>`)
//! - RAII [`Subscription`] guards that unsubscribe on drop
//!
//! Handlers are invoked on the thread that raises the event, outside the
//! event's internal lock, so a handler may subscribe, unsubscribe or raise
//! other events without deadlocking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Handler priority
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low = 0,
    Normal = 1,
    High = 2,
    Critical = 3,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Subscriber ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub u64);

/// Event handler function type
pub type EventHandler<A> = Arc<dyn Fn(&A) + Send + Sync>;

struct HandlerEntry<A: ?Sized> {
    id: SubscriberId,
    priority: Priority,
    handler: EventHandler<A>,
}

struct EventInner<A: ?Sized> {
    handlers: Mutex<Vec<HandlerEntry<A>>>,
    next_subscriber_id: AtomicU64,
}

/// Anything a [`Subscription`] can unsubscribe from
trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: SubscriberId) -> bool;
}

impl<A: ?Sized + 'static> Unsubscribe for EventInner<A> {
    fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|entry| entry.id != id);
        before != handlers.len()
    }
}

/// Multicast event. Cloning yields another handle to the same event.
pub struct Event<A: ?Sized + 'static> {
    inner: Arc<EventInner<A>>,
}

impl<A: ?Sized + 'static> Event<A> {
    /// Create a new event with no handlers
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EventInner {
                handlers: Mutex::new(Vec::new()),
                next_subscriber_id: AtomicU64::new(1),
            }),
        }
    }

    /// Add a handler
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.subscribe_with_priority(handler, Priority::Normal)
    }

    /// Add a handler with priority
    pub fn subscribe_with_priority<F>(&self, handler: F, priority: Priority) -> SubscriberId
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.inner.handlers.lock();
        handlers.push(HandlerEntry {
            id,
            priority,
            handler: Arc::new(handler),
        });
        // Stable sort keeps subscription order within a priority
        handlers.sort_by(|a, b| b.priority.cmp(&a.priority));
        id
    }

    /// Add a handler that is removed when the returned guard drops
    pub fn subscription<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        self.subscription_with_priority(handler, Priority::Normal)
    }

    /// [`subscription`](Self::subscription) with a priority
    pub fn subscription_with_priority<F>(&self, handler: F, priority: Priority) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = self.subscribe_with_priority(handler, priority);
        let weak: Weak<EventInner<A>> = Arc::downgrade(&self.inner);
        let source: Weak<dyn Unsubscribe> = weak;
        Subscription {
            id,
            source: Some(source),
        }
    }

    /// Remove a handler
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        self.inner.unsubscribe(id)
    }

    /// Call every handler; returns how many ran
    pub fn invoke(&self, args: &A) -> usize {
        let snapshot: Vec<EventHandler<A>> = self
            .inner
            .handlers
            .lock()
            .iter()
            .map(|entry| entry.handler.clone())
            .collect();
        for handler in &snapshot {
            handler(args);
        }
        snapshot.len()
    }

    /// Number of handlers
    pub fn handler_count(&self) -> usize {
        self.inner.handlers.lock().len()
    }

    /// Check if any handler is attached
    pub fn has_handlers(&self) -> bool {
        self.handler_count() > 0
    }

    /// Remove all handlers
    pub fn clear(&self) {
        self.inner.handlers.lock().clear();
    }
}

impl<A: ?Sized + 'static> Clone for Event<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: ?Sized + 'static> Default for Event<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized + 'static> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

/// Guard that removes its handler when dropped.
///
/// Holds only a weak reference to the event, so it never keeps the event
/// (or whatever owns it) alive.
pub struct Subscription {
    id: SubscriberId,
    source: Option<Weak<dyn Unsubscribe>>,
}

impl Subscription {
    /// A guard that is not attached to anything
    pub fn empty() -> Self {
        Self {
            id: SubscriberId(0),
            source: None,
        }
    }

    /// The subscriber id
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// True while the event still exists
    pub fn is_connected(&self) -> bool {
        self.source
            .as_ref()
            .map(|source| source.strong_count() > 0)
            .unwrap_or(false)
    }

    /// Unsubscribe now. Returns false if the event was already gone.
    pub fn release(&mut self) -> bool {
        match self.source.take().and_then(|source| source.upgrade()) {
            Some(source) => source.unsubscribe(self.id),
            None => false,
        }
    }

    /// Keep the handler attached for the lifetime of the event
    pub fn forget(mut self) {
        self.source = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Prelude
pub mod prelude {
    pub use crate::{Event, EventHandler, Priority, SubscriberId, Subscription};
}
