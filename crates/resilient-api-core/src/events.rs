//! Typed events emitted by the breaker, cache, executor and scheduler.
//!
//! Each component owns an event enum implementing [`ResilienceEvent`] and an
//! [`EventListeners`] list that its builder fills from `on_*` callbacks.
//! Listeners run synchronously on the emitting task, in registration order.
//! A panicking listener is caught and counted; the others still run.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// An event raised by one named component instance.
pub trait ResilienceEvent: fmt::Debug + Send + Sync + 'static {
    /// Component family, e.g. `"circuitbreaker"` or `"cache"`.
    const COMPONENT: &'static str;

    /// Short machine-readable event kind (e.g. `"state_transition"`).
    fn event_type(&self) -> &'static str;

    /// When the event was raised.
    fn timestamp(&self) -> Instant;

    /// Name of the instance that raised the event.
    fn source_name(&self) -> &str;

    /// Component family and instance name together.
    fn origin(&self) -> EventOrigin<'_> {
        EventOrigin {
            component: Self::COMPONENT,
            source: self.source_name(),
        }
    }
}

/// Where an event came from. Displays as `component/source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOrigin<'a> {
    pub component: &'static str,
    pub source: &'a str,
}

impl fmt::Display for EventOrigin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component, self.source)
    }
}

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Callbacks subscribed to one event type.
///
/// Clones share the callbacks and the panic count.
pub struct EventListeners<E> {
    callbacks: Vec<Callback<E>>,
    panics: Arc<AtomicU64>,
}

impl<E: ResilienceEvent> EventListeners<E> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
            panics: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribes `f` to every event.
    pub fn on<F>(&mut self, f: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(f));
    }

    /// Subscribes `f` to events whose [`ResilienceEvent::event_type`] is
    /// `kind`.
    pub fn on_kind<F>(&mut self, kind: &'static str, f: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.on(move |event: &E| {
            if event.event_type() == kind {
                f(event);
            }
        });
    }

    /// Delivers `event` to every callback in registration order.
    pub fn emit(&self, event: &E) {
        for callback in &self.callbacks {
            let delivered =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(event)));
            if delivered.is_err() {
                self.panics.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Number of callback panics swallowed so far.
    pub fn panicked(&self) -> u64 {
        self.panics.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }
}

impl<E> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            callbacks: self.callbacks.clone(),
            panics: Arc::clone(&self.panics),
        }
    }
}

impl<E: ResilienceEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.callbacks.len())
            .field("panicked", &self.panics.load(Ordering::Relaxed))
            .finish()
    }
}
