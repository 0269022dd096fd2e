//! Inbound message handlers.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::types::ClientMessage;

/// Receives every application message read from any client.
///
/// Handlers run on the connection's read task, so a slow handler delays
/// further reads from that client only.
pub trait MessageHandler: Send + Sync + 'static {
    /// Handle one inbound message.
    fn handle(&self, message: ClientMessage);
}

impl<F> MessageHandler for F
where
    F: Fn(ClientMessage) + Send + Sync + 'static,
{
    fn handle(&self, message: ClientMessage) {
        self(message)
    }
}

/// Ordered set of handlers. Registration may happen at any time; each inbound
/// message is delivered to the handlers present when it was read.
#[derive(Default)]
pub struct HandlerSet {
    handlers: RwLock<Vec<Arc<dyn MessageHandler>>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler.
    pub fn push<H: MessageHandler>(&self, handler: H) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every handler, in registration order, with its own copy.
    pub fn dispatch(&self, message: &ClientMessage) {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in &handlers {
            handler.handle(message.clone());
        }
    }
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSet")
            .field("handlers", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn handlers_run_in_registration_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let set = HandlerSet::new();

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            set.push(move |msg: ClientMessage| {
                seen.lock().unwrap().push(format!("{tag}:{}", msg.client_id));
            });
        }

        set.dispatch(&ClientMessage::new("c1", "x"));
        assert_eq!(*seen.lock().unwrap(), vec!["first:c1", "second:c1"]);
    }

    #[test]
    fn empty_set_is_a_no_op() {
        let set = HandlerSet::new();
        assert!(set.is_empty());
        set.dispatch(&ClientMessage::new("c1", "x"));
    }
}
