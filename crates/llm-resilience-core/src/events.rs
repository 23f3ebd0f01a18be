//! Observability event system.
//!
//! Adapted from `tower_resilience_core::events`: a small observer pattern that
//! lets every pattern crate (rate limiter, circuit breaker, orchestrator)
//! emit structured events without depending on a specific metrics/tracing
//! backend. Listener panics are caught so one misbehaving listener cannot
//! take down an in-flight request.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trait for events emitted by a resilience/orchestration component.
pub trait ResilienceEvent: Send + Sync + fmt::Debug {
    /// Event type, e.g. `"state_transition"`, `"permit_rejected"`.
    fn event_type(&self) -> &'static str;

    fn timestamp(&self) -> Instant;

    /// Name of the component instance that emitted this event.
    fn component(&self) -> &str;
}

/// Trait for listening to events.
pub trait EventListener<E: ResilienceEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// A collection of event listeners for one event type.
#[derive(Clone)]
pub struct EventListeners<E: ResilienceEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: ResilienceEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to all registered listeners, isolating panics.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));

            if result.is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    component = event.component(),
                    event_type = event.event_type(),
                    "event listener panicked"
                );

                #[cfg(feature = "metrics")]
                metrics::counter!(
                    "orchestration_event_listener_panics_total",
                    "component" => event.component().to_string(),
                    "event_type" => event.event_type()
                )
                .increment(1);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: ResilienceEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A simple function-based listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<E>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: ResilienceEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct TestEvent {
        name: String,
        timestamp: Instant,
    }

    impl ResilienceEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            "test"
        }

        fn timestamp(&self) -> Instant {
            self.timestamp
        }

        fn component(&self) -> &str {
            &self.name
        }
    }

    #[test]
    fn emits_to_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c1 = Arc::clone(&counter);

        let mut listeners = EventListeners::new();
        listeners.add(FnListener::new(move |_: &TestEvent| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));

        let event = TestEvent {
            name: "test".into(),
            timestamp: Instant::now(),
        };

        listeners.emit(&event);
        listeners.emit(&event);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c1 = Arc::clone(&counter);

        let mut listeners = EventListeners::new();
        listeners.add(FnListener::new(|_: &TestEvent| panic!("boom")));
        listeners.add(FnListener::new(move |_: &TestEvent| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));

        let event = TestEvent {
            name: "panic-test".into(),
            timestamp: Instant::now(),
        };

        listeners.emit(&event);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
