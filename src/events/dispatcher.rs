//! Single-listener event dispatcher
//!
//! Each lifecycle event has at most one bound callback. Binding again replaces
//! the previous callback. Dispatching an event nobody listens to is a no-op.

use std::collections::HashMap;
use std::rc::Rc;

use super::{EventData, EventName};
use crate::Error;

/// Type for bound lifecycle callbacks
type EventCallback<C> = Rc<dyn Fn(&C, &EventData)>;

struct Subscription<C> {
    callback: EventCallback<C>,
    context: C,
}

impl<C: Clone> Clone for Subscription<C> {
    fn clone(&self) -> Self {
        Self {
            callback: self.callback.clone(),
            context: self.context.clone(),
        }
    }
}

/// Maps lifecycle events to their one bound callback and invocation context
pub struct EventDispatcher<C = ()> {
    subscriptions: HashMap<EventName, Subscription<C>>,
}

impl<C> std::fmt::Debug for EventDispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut bound: Vec<_> = self.subscriptions.keys().collect();
        bound.sort();
        f.debug_struct("EventDispatcher")
            .field("bound", &bound)
            .finish()
    }
}

impl<C> Default for EventDispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> EventDispatcher<C> {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self {
            subscriptions: HashMap::new(),
        }
    }

    /// Bind `callback` to `event`, replacing any previous binding
    pub fn subscribe<F>(&mut self, event: EventName, callback: F, context: C)
    where
        F: Fn(&C, &EventData) + 'static,
    {
        if self
            .subscriptions
            .insert(
                event,
                Subscription {
                    callback: Rc::new(callback),
                    context,
                },
            )
            .is_some()
        {
            log::debug!("replaced subscriber for {event}");
        }
    }

    /// Bind by wire name; unknown names are rejected
    pub fn subscribe_named<F>(&mut self, name: &str, callback: F, context: C) -> Result<(), Error>
    where
        F: Fn(&C, &EventData) + 'static,
    {
        let event: EventName = name.parse()?;
        self.subscribe(event, callback, context);
        Ok(())
    }

    /// Remove the callback bound to `event`
    pub fn unsubscribe(&mut self, event: EventName) {
        self.subscriptions.remove(&event);
    }

    /// Remove by wire name; unknown names are rejected
    pub fn unsubscribe_named(&mut self, name: &str) -> Result<(), Error> {
        let event: EventName = name.parse()?;
        self.unsubscribe(event);
        Ok(())
    }

    pub fn is_subscribed(&self, event: EventName) -> bool {
        self.subscriptions.contains_key(&event)
    }
}

impl<C: Clone> EventDispatcher<C> {
    /// Snapshot the binding for `event` so it can be invoked after the
    /// dispatcher itself is no longer borrowed.
    pub fn bound(&self, event: EventName) -> Option<BoundCallback<C>> {
        self.subscriptions.get(&event).map(|subscription| BoundCallback {
            subscription: subscription.clone(),
        })
    }

    /// Invoke the callback bound to `event`, if any
    pub fn dispatch(&self, event: EventName, data: &EventData) {
        if let Some(bound) = self.bound(event) {
            bound.invoke(data);
        }
    }
}

/// A callback detached from its dispatcher, ready to run
pub struct BoundCallback<C> {
    subscription: Subscription<C>,
}

impl<C> BoundCallback<C> {
    pub fn invoke(&self, data: &EventData) {
        (self.subscription.callback)(&self.subscription.context, data);
    }
}
