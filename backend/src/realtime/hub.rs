//! Fan-out of store changes to per-user subscriptions.
//!
//! Every change is published once with the id of the user who owns the
//! affected event. Subscriptions only see changes owned by their user, which
//! for venues means the owner of the parent event.

use log::{debug, info, warn};
use shared::realtime::{
    dispatch_event_change, dispatch_venue_change, ChangeFeedMessage, ChannelStatus,
    EventSubscriptionHandlers, VenueSubscriptionHandlers,
};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// One published change and the user allowed to see it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEnvelope {
    pub owner_id: String,
    pub message: ChangeFeedMessage,
}

pub type ErrorCallback = Box<dyn FnMut(ChannelStatus) + Send + 'static>;

/// Handle to the streams opened by one subscribe call. Dropping it has the
/// same effect as [`Subscription::unsubscribe`].
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    tasks: Vec<JoinHandle<()>>,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn is_active(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    /// Tears down every stream on this channel.
    pub fn unsubscribe(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        debug!("Unsubscribed channel={}", self.channel);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Realtime change hub. Constructed once at start-up and shared through
/// `web::Data`.
#[derive(Clone)]
pub struct RealtimeHub {
    sender: broadcast::Sender<Arc<FeedEnvelope>>,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl RealtimeHub {
    /// `capacity` is how far a subscriber may fall behind before its channel
    /// fails.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes `message` to the subscriptions of `owner_id`. Returns how
    /// many open streams received it.
    pub fn publish(&self, owner_id: &str, message: ChangeFeedMessage) -> usize {
        debug!("Publishing {} for user_id={}", message, owner_id);
        self.sender
            .send(Arc::new(FeedEnvelope {
                owner_id: owner_id.to_string(),
                message,
            }))
            .unwrap_or(0)
    }

    /// Number of open streams across all subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn subscribe_to_events<H>(&self, channel: &str, user_id: &str, mut handlers: H) -> Subscription
    where
        H: EventSubscriptionHandlers + Send + 'static,
    {
        let task = self.spawn_stream(channel, user_id, None, move |message| {
            dispatch_event_change(message, &mut handlers);
        });
        Subscription {
            channel: channel.to_string(),
            tasks: vec![task],
        }
    }

    pub fn subscribe_to_venues<H>(&self, channel: &str, user_id: &str, mut handlers: H) -> Subscription
    where
        H: VenueSubscriptionHandlers + Send + 'static,
    {
        let task = self.spawn_stream(channel, user_id, None, move |message| {
            dispatch_venue_change(message, &mut handlers);
        });
        Subscription {
            channel: channel.to_string(),
            tasks: vec![task],
        }
    }

    /// Event and venue changes on one stream, so the handlers see them in
    /// publication order. `on_error` fires once if the channel fails; the
    /// stream is not retried.
    pub fn subscribe_to_both<E, V>(
        &self,
        channel: &str,
        user_id: &str,
        mut event_handlers: E,
        mut venue_handlers: V,
        on_error: Option<ErrorCallback>,
    ) -> Subscription
    where
        E: EventSubscriptionHandlers + Send + 'static,
        V: VenueSubscriptionHandlers + Send + 'static,
    {
        let task = self.spawn_stream(channel, user_id, on_error, move |message| {
            if !dispatch_event_change(message, &mut event_handlers) {
                dispatch_venue_change(message, &mut venue_handlers);
            }
        });
        Subscription {
            channel: channel.to_string(),
            tasks: vec![task],
        }
    }

    fn spawn_stream<F>(
        &self,
        channel: &str,
        user_id: &str,
        mut on_error: Option<ErrorCallback>,
        mut deliver: F,
    ) -> JoinHandle<()>
    where
        F: FnMut(&ChangeFeedMessage) + Send + 'static,
    {
        // Subscribe before spawning so nothing published after this call is missed.
        let mut receiver = self.sender.subscribe();
        let channel = channel.to_string();
        let user_id = user_id.to_string();
        info!("Subscribed channel={} user_id={}", channel, user_id);

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(envelope) => {
                        if envelope.owner_id == user_id {
                            deliver(&envelope.message);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(
                            "Realtime channel error: channel={} user_id={} skipped={}",
                            channel, user_id, skipped
                        );
                        if let Some(on_error) = on_error.as_mut() {
                            on_error(ChannelStatus::ChannelError);
                        }
                        break;
                    }
                    Err(RecvError::Closed) => {
                        debug!("Realtime feed closed: channel={}", channel);
                        break;
                    }
                }
            }
        })
    }
}
