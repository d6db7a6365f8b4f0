use std::collections::HashMap;

use log::debug;

type Handler<C> = Box<dyn Fn(&C) + Send + Sync>;

/// Routes named UI events (menu ids) to handlers.
pub struct Dispatcher<C> {
    handlers: HashMap<String, Handler<C>>,
}

impl<C> Default for Dispatcher<C> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<C> Dispatcher<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `event`, replacing any previous one.
    pub fn on<F>(mut self, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&C) + Send + Sync + 'static,
    {
        self.handlers.insert(event.into(), Box::new(handler));
        self
    }

    /// Returns `false` when nothing is registered for `event`.
    pub fn dispatch(&self, event: &str, ctx: &C) -> bool {
        match self.handlers.get(event) {
            Some(handler) => {
                handler(ctx);
                true
            }
            None => {
                debug!("No handler for UI event '{}'", event);
                false
            }
        }
    }
}
