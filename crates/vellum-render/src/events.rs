//! Frame notifications.
//!
//! Listeners are owned by the renderer instance. [`RenderEvents::add_listener`]
//! returns a [`ListenerId`] that removes the listener again.

/// A notification emitted around every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderEvent {
    /// Before anything is drawn.
    BeforeRender {
        /// Simulation timestamp of the scene, in milliseconds.
        timestamp: f64,
    },
    /// After the last overlay is drawn.
    AfterRender {
        /// Simulation timestamp of the scene, in milliseconds.
        timestamp: f64,
    },
}

impl RenderEvent {
    /// Scene timestamp of the frame, in milliseconds.
    pub fn timestamp(&self) -> f64 {
        match *self {
            RenderEvent::BeforeRender { timestamp } | RenderEvent::AfterRender { timestamp } => {
                timestamp
            }
        }
    }
}

/// Handle returned by [`RenderEvents::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&RenderEvent)>;

/// Ordered list of frame listeners.
#[derive(Default)]
pub struct RenderEvents {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl RenderEvents {
    /// Empty listener list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners run in registration order.
    pub fn add_listener(&mut self, listener: impl FnMut(&RenderEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Deliver `event` to every listener.
    pub fn emit(&mut self, event: &RenderEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for RenderEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderEvents")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_receive_events_in_order_until_removed() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut events = RenderEvents::new();

        let first = {
            let log = Rc::clone(&log);
            events.add_listener(move |e| log.borrow_mut().push(("first", e.timestamp())))
        };
        {
            let log = Rc::clone(&log);
            events.add_listener(move |e| log.borrow_mut().push(("second", e.timestamp())));
        }

        events.emit(&RenderEvent::BeforeRender { timestamp: 1.0 });
        assert!(events.remove_listener(first));
        assert!(!events.remove_listener(first));
        events.emit(&RenderEvent::AfterRender { timestamp: 2.0 });

        assert_eq!(
            *log.borrow(),
            vec![("first", 1.0), ("second", 1.0), ("second", 2.0)]
        );
        assert_eq!(events.len(), 1);
    }
}
