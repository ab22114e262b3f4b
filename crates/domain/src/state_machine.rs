//! Core state machine and domain event traits.

use common::InstanceRef;

/// Trait for domain events.
///
/// Events are facts that have happened to an instance. They are named in
/// past tense and never rejected once produced.
pub trait DomainEvent: Clone + Send + Sync {
    /// Returns the event type name, used for logging and metrics labels.
    fn event_type(&self) -> &'static str;
}

/// Trait for the instances driven by the saga.
///
/// An instance owns its state exclusively. All changes go through `apply`,
/// which must be:
/// - pure and deterministic: the same state and event always give the same result
/// - free of side effects
/// - infallible: an event that makes no sense for the current state is ignored
///
/// Because `apply` is a plain function over a struct, any sequence of
/// messages can be replayed against a bare instance without a runtime.
pub trait StateMachine: Send + Sync {
    /// The events this instance consumes.
    type Event: DomainEvent;

    /// Returns the address of this instance.
    fn instance(&self) -> InstanceRef;

    /// Applies an event to the instance, updating its state.
    fn apply(&mut self, event: Self::Event);

    /// Returns true once the instance has reached a terminal state.
    fn is_terminal(&self) -> bool;

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderId;

    #[derive(Debug, Clone)]
    enum CounterEvent {
        Incremented,
        Closed,
    }

    impl DomainEvent for CounterEvent {
        fn event_type(&self) -> &'static str {
            match self {
                CounterEvent::Incremented => "Incremented",
                CounterEvent::Closed => "Closed",
            }
        }
    }

    #[derive(Debug, Default)]
    struct Counter {
        value: u32,
        closed: bool,
    }

    impl StateMachine for Counter {
        type Event = CounterEvent;

        fn instance(&self) -> InstanceRef {
            InstanceRef::Order(OrderId::new("counter"))
        }

        fn apply(&mut self, event: Self::Event) {
            if self.closed {
                return;
            }
            match event {
                CounterEvent::Incremented => self.value += 1,
                CounterEvent::Closed => self.closed = true,
            }
        }

        fn is_terminal(&self) -> bool {
            self.closed
        }
    }

    #[test]
    fn test_apply_events_in_sequence() {
        let mut counter = Counter::default();
        counter.apply_events(vec![
            CounterEvent::Incremented,
            CounterEvent::Incremented,
            CounterEvent::Closed,
            CounterEvent::Incremented,
        ]);

        assert_eq!(counter.value, 2);
        assert!(counter.is_terminal());
    }

    #[test]
    fn test_event_type() {
        assert_eq!(CounterEvent::Incremented.event_type(), "Incremented");
        assert_eq!(CounterEvent::Closed.event_type(), "Closed");
    }
}
