//! Greeting-keyed request dispatch.
//!
//! An inbound message carries a `greeting` field, handlers are tried in
//! registration order, and a handler that wants to answer asynchronously
//! keeps the responder instead of handing it back.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::store::KvStore;
use crate::tips::TIP_KEY;

/// The greeting that requests the current tip.
pub const TIP_GREETING: &str = "tip";

/// Inbound message shape. Unknown extra fields are ignored on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub greeting: String,
}

impl Message {
    pub fn new(greeting: impl Into<String>) -> Self {
        Self {
            greeting: greeting.into(),
        }
    }
}

/// One-shot reply channel handed to handlers.
///
/// Dropping a kept responder without sending completes the request with no
/// response at all.
#[derive(Debug)]
pub struct Responder {
    tx: oneshot::Sender<Value>,
}

impl Responder {
    /// Sends the response. The requester may already be gone, which is
    /// fine.
    pub fn respond(self, value: Value) {
        let _ = self.tx.send(value);
    }
}

/// A registered message listener.
///
/// Handing the responder back means "not mine, try the next handler";
/// consuming it (returning `None`) signals that a response is on its way.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message, responder: Responder) -> Option<Responder>;
}

/// Tries handlers in registration order until one keeps the responder.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<Box<dyn MessageHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: impl MessageHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Routes `message` and waits for the (possibly deferred) response.
    ///
    /// `None` when no handler claimed the message, or when the claimant
    /// dropped the responder without answering.
    pub async fn dispatch(&self, message: Message) -> Option<Value> {
        let (tx, rx) = oneshot::channel();
        let mut responder = Responder { tx };
        for handler in &self.handlers {
            match handler.handle(&message, responder).await {
                Some(declined) => responder = declined,
                None => return rx.await.ok(),
            }
        }
        None
    }
}

/// Answers `{"greeting": "tip"}` with the stored tip value.
///
/// The reply is always `{"tip": ...}`, with `null` standing in until the
/// first refresh has completed.
pub struct TipRequestHandler<S> {
    store: Arc<S>,
}

impl<S> TipRequestHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: KvStore + 'static> MessageHandler for TipRequestHandler<S> {
    async fn handle(&self, message: &Message, responder: Responder) -> Option<Responder> {
        if message.greeting != TIP_GREETING {
            return Some(responder);
        }
        let store = Arc::clone(&self.store);
        // The reply lands after this handler has already returned its
        // will-respond sentinel.
        tokio::spawn(async move {
            let tip = match store.get(TIP_KEY).await {
                Ok(value) => value.unwrap_or(Value::Null),
                Err(e) => {
                    // Dropping the responder completes the request with no
                    // response at all.
                    log::error!("could not read the stored tip: {e}");
                    return;
                }
            };
            responder.respond(json!({ "tip": tip }));
        });
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};

    /// Store whose reads always fail.
    struct BrokenStore;

    #[async_trait]
    impl KvStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Value>, StoreError> {
            Err(StoreError::Read(std::io::Error::other("disk on fire")))
        }

        async fn set(&self, _key: &str, _value: Value) -> Result<(), StoreError> {
            Err(StoreError::Write(std::io::Error::other("disk on fire")))
        }
    }

    /// Claims everything and never answers.
    struct BlackHole;

    #[async_trait]
    impl MessageHandler for BlackHole {
        async fn handle(&self, _message: &Message, _responder: Responder) -> Option<Responder> {
            None
        }
    }

    /// Answers only its own greeting, echoing a fixed tag.
    struct Echo(&'static str);

    #[async_trait]
    impl MessageHandler for Echo {
        async fn handle(&self, message: &Message, responder: Responder) -> Option<Responder> {
            if message.greeting != self.0 {
                return Some(responder);
            }
            responder.respond(json!({ "echo": self.0 }));
            None
        }
    }

    fn tip_dispatcher(store: Arc<MemoryStore>) -> Dispatcher {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(TipRequestHandler::new(store));
        dispatcher
    }

    #[tokio::test]
    async fn test_tip_greeting_returns_the_stored_tip() {
        let store = Arc::new(MemoryStore::with_entries([(TIP_KEY, json!("hydrate"))]));
        let dispatcher = tip_dispatcher(store);

        let response = dispatcher.dispatch(Message::new(TIP_GREETING)).await;

        assert_eq!(response, Some(json!({ "tip": "hydrate" })));
    }

    #[tokio::test]
    async fn test_tip_greeting_before_any_refresh_returns_null() {
        let dispatcher = tip_dispatcher(Arc::new(MemoryStore::new()));

        let response = dispatcher.dispatch(Message::new(TIP_GREETING)).await;

        assert_eq!(response, Some(json!({ "tip": null })));
    }

    #[tokio::test]
    async fn test_unknown_greeting_gets_no_response() {
        let store = Arc::new(MemoryStore::with_entries([(TIP_KEY, json!("hydrate"))]));
        let dispatcher = tip_dispatcher(store);

        let response = dispatcher.dispatch(Message::new("weather")).await;

        assert_eq!(response, None);
    }

    #[tokio::test]
    async fn test_empty_dispatcher_gets_no_response() {
        let dispatcher = Dispatcher::new();

        assert_eq!(dispatcher.dispatch(Message::new(TIP_GREETING)).await, None);
    }

    #[tokio::test]
    async fn test_handlers_run_in_registration_order() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Echo("first"));
        dispatcher.register(Echo("second"));

        let response = dispatcher.dispatch(Message::new("second")).await;

        assert_eq!(response, Some(json!({ "echo": "second" })));
    }

    #[tokio::test]
    async fn test_unreadable_store_completes_with_no_response() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(TipRequestHandler::new(Arc::new(BrokenStore)));

        let response = dispatcher.dispatch(Message::new(TIP_GREETING)).await;

        assert_eq!(response, None);
    }

    #[tokio::test]
    async fn test_claimed_but_never_answered_resolves_to_none() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(BlackHole);
        dispatcher.register(Echo("tip"));

        // BlackHole claims the message first; Echo never sees it.
        let response = dispatcher.dispatch(Message::new("tip")).await;

        assert_eq!(response, None);
    }

    #[test]
    fn test_message_parses_with_extra_fields() {
        let message: Message =
            serde_json::from_value(json!({ "greeting": "tip", "extra": 1 })).unwrap();
        assert_eq!(message, Message::new("tip"));
    }

    #[test]
    fn test_message_serializes_to_the_wire_shape() {
        let value = serde_json::to_value(Message::new("tip")).unwrap();
        assert_eq!(value, json!({ "greeting": "tip" }));
    }
}
