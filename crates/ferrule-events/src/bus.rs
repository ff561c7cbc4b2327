//! The event bus.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, trace, warn};

use crate::error::{EventError, EventResult, SubscriberResult};
use crate::event::Event;

/// Identifies one subscription, for [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Handler<P> = Arc<dyn Fn(P) -> BoxFuture<'static, SubscriberResult<P>> + Send + Sync>;

struct Subscription {
    id: SubscriberId,
    /// A `Handler<E::Payload>` for the channel's event type.
    handler: Arc<dyn Any + Send + Sync>,
}

/// Ordered, chainable publish/subscribe.
///
/// Construct one per host context and share it as `Arc<EventBus>`.
/// Subscribing and unsubscribing never block an in-flight emission: each
/// emission works on a snapshot of the subscriber list taken when it starts.
pub struct EventBus {
    channels: RwLock<HashMap<TypeId, Vec<Subscription>>>,
    next_id: AtomicU64,
    subscriber_timeout: Option<Duration>,
}

impl EventBus {
    /// Create a bus without a subscriber timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            subscriber_timeout: None,
        }
    }

    /// Abort emissions whose current subscriber runs longer than `timeout`.
    #[must_use]
    pub fn with_subscriber_timeout(mut self, timeout: Duration) -> Self {
        self.subscriber_timeout = Some(timeout);
        self
    }

    /// The configured subscriber timeout, if any.
    #[must_use]
    pub fn subscriber_timeout(&self) -> Option<Duration> {
        self.subscriber_timeout
    }

    /// Append an async subscriber to `E`'s chain.
    pub fn subscribe<E, F, Fut>(&self, callback: F) -> SubscriberId
    where
        E: Event,
        F: Fn(E::Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = SubscriberResult<E::Payload>> + Send + 'static,
    {
        let handler: Handler<E::Payload> = Arc::new(move |payload| callback(payload).boxed());
        self.insert::<E>(handler)
    }

    /// Append a synchronous subscriber to `E`'s chain.
    pub fn subscribe_sync<E, F>(&self, callback: F) -> SubscriberId
    where
        E: Event,
        F: Fn(E::Payload) -> SubscriberResult<E::Payload> + Send + Sync + 'static,
    {
        let handler: Handler<E::Payload> =
            Arc::new(move |payload| futures::future::ready(callback(payload)).boxed());
        self.insert::<E>(handler)
    }

    fn insert<E: Event>(&self, handler: Handler<E::Payload>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut channels = self.channels.write().unwrap_or_else(|e| {
            warn!("EventBus lock poisoned, recovering");
            e.into_inner()
        });
        channels
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Subscription {
                id,
                handler: Arc::new(handler),
            });
        debug!(event = E::NAME, subscriber = %id, "Subscribed");
        id
    }

    /// Remove a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut channels = self.channels.write().unwrap_or_else(|e| {
            warn!("EventBus lock poisoned, recovering");
            e.into_inner()
        });
        for subscriptions in channels.values_mut() {
            if let Some(pos) = subscriptions.iter().position(|s| s.id == id) {
                subscriptions.remove(pos);
                debug!(subscriber = %id, "Unsubscribed");
                return true;
            }
        }
        false
    }

    /// Number of subscribers currently attached to `E`.
    #[must_use]
    pub fn subscriber_count<E: Event>(&self) -> usize {
        let channels = self.channels.read().unwrap_or_else(|e| {
            warn!("EventBus lock poisoned, recovering");
            e.into_inner()
        });
        channels.get(&TypeId::of::<E>()).map_or(0, Vec::len)
    }

    /// Run `E`'s subscribers in order, threading the payload, and return the
    /// final payload.
    ///
    /// Each subscriber receives its own clone of the current payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SubscriberFailed`] on the first subscriber
    /// error and [`EventError::Timeout`] when a subscriber exceeds the
    /// configured timeout. Remaining subscribers are skipped in both cases.
    pub async fn emit<E: Event>(&self, payload: E::Payload) -> EventResult<E::Payload> {
        let chain = self.snapshot::<E>();
        trace!(event = E::NAME, subscribers = chain.len(), "Emitting event");

        let mut current = payload;
        for (id, handler) in chain {
            let call = handler(current.clone());
            let outcome = match self.subscriber_timeout {
                Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                    warn!(event = E::NAME, subscriber = %id, timeout = ?limit, "Subscriber timed out");
                    EventError::Timeout {
                        event: E::NAME,
                        subscriber: id,
                        timeout: limit,
                    }
                })?,
                None => call.await,
            };

            match outcome {
                Ok(Some(replacement)) => current = replacement,
                Ok(None) => {},
                Err(source) => {
                    warn!(event = E::NAME, subscriber = %id, error = %source, "Subscriber failed");
                    return Err(EventError::SubscriberFailed {
                        event: E::NAME,
                        subscriber: id,
                        source,
                    });
                },
            }
        }

        Ok(current)
    }

    fn snapshot<E: Event>(&self) -> Vec<(SubscriberId, Handler<E::Payload>)> {
        let channels = self.channels.read().unwrap_or_else(|e| {
            warn!("EventBus lock poisoned, recovering");
            e.into_inner()
        });
        channels
            .get(&TypeId::of::<E>())
            .map(|subs| {
                subs.iter()
                    .filter_map(|s| {
                        Arc::clone(&s.handler)
                            .downcast::<Handler<E::Payload>>()
                            .ok()
                            .map(|h| (s.id, Arc::clone(&*h)))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.channels.read().map(|c| c.len()).unwrap_or(0);
        f.debug_struct("EventBus")
            .field("channels", &channels)
            .field("subscriber_timeout", &self.subscriber_timeout)
            .finish_non_exhaustive()
    }
}
