use super::{BusError, BusPublisher, BusTransport, InboundMessage, MessageHandler};
use crate::{error, event, info, warn};
use std::{collections::HashMap, sync::Arc};
use tokio_util::sync::CancellationToken;

/// One live broker connection per process.
///
/// Handlers are registered once before [`run`](Self::run) and are invoked
/// sequentially on the task that drives the session, one call per inbound message.
pub struct BusSession<T: BusTransport> {
    transport: T,
    handlers: HashMap<String, Box<dyn MessageHandler>>,
}

impl<T: BusTransport> BusSession<T> {
    pub fn new(transport: T) -> Self { Self { transport, handlers: HashMap::new() } }

    /// A cloneable handle for publishing from other tasks.
    pub fn publisher(&self) -> Arc<dyn BusPublisher> { self.transport.publisher() }

    /// Registers the single handler for `topic` and subscribes to it.
    ///
    /// # Errors
    /// [`BusError::DuplicateSubscription`] if the topic already has a handler,
    /// [`BusError::Subscribe`] if the request could not be issued.
    pub async fn subscribe<H>(&mut self, topic: &str, handler: H) -> Result<(), BusError>
    where
        H: MessageHandler + 'static,
    {
        if self.handlers.contains_key(topic) {
            return Err(BusError::DuplicateSubscription(topic.to_string()));
        }
        self.transport.subscribe(topic).await?;
        self.handlers.insert(topic.to_string(), Box::new(handler));
        info!("Subscribed to '{topic}'.");
        Ok(())
    }

    /// Dispatches inbound messages until the connection drops or `shutdown` fires.
    ///
    /// A handler that is running when `shutdown` fires finishes first.
    ///
    /// # Errors
    /// Returns [`BusError::ConnectionLost`] when the session ends unexpectedly.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), BusError> {
        loop {
            let next = tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Bus session shutting down.");
                    return Ok(());
                }
                next = self.transport.next_message() => next,
            };
            match next {
                Ok(msg) => self.dispatch(msg).await,
                Err(e) => {
                    error!("Bus session ended: {e}");
                    return Err(e);
                }
            }
        }
    }

    async fn dispatch(&mut self, msg: InboundMessage) {
        if let Some(handler) = self.handlers.get_mut(&msg.topic) {
            event!("Inbound on '{}': {}", msg.topic, String::from_utf8_lossy(&msg.payload));
            handler.handle(&msg.payload).await;
        } else {
            warn!("Dropping message on '{}' without a handler.", msg.topic);
        }
    }
}
