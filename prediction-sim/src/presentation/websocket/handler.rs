use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::ports::{MarketReader, UserReader};
use crate::domain::MarketEvent;
use crate::infrastructure::{BroadcastEventPublisher, InMemoryLedgerRepository};

use super::message::{ClientMessage, ServerMessage, Topic};

/// Frames buffered per connection before a subscription is dropped
pub const DEFAULT_OUTBOX_CAPACITY: usize = 256;

/// Topics a single connection may hold at once
pub const DEFAULT_MAX_SUBSCRIPTIONS: usize = 64;

/// WebSocket connection state
pub struct WsState {
    pub event_publisher: Arc<BroadcastEventPublisher>,
    /// Used to refuse topics for markets and users that do not exist
    pub ledger: Arc<InMemoryLedgerRepository>,
    pub outbox_capacity: usize,
    pub max_subscriptions: usize,
}

impl WsState {
    pub fn new(
        event_publisher: Arc<BroadcastEventPublisher>,
        ledger: Arc<InMemoryLedgerRepository>,
    ) -> Self {
        WsState {
            event_publisher,
            ledger,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
            max_subscriptions: DEFAULT_MAX_SUBSCRIPTIONS,
        }
    }

    pub fn with_max_subscriptions(mut self, max_subscriptions: usize) -> Self {
        self.max_subscriptions = max_subscriptions.max(1);
        self
    }
}

/// Handle WebSocket upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<WsState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<WsState>) {
    let (mut sender, mut receiver) = socket.split();

    // Channel for outgoing messages
    let (tx, mut rx) = mpsc::channel::<String>(state.outbox_capacity.max(1));

    // Spawn task to forward messages to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    let mut subscriptions: HashMap<Topic, JoinHandle<()>> = HashMap::new();

    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        // Forwarders that hit a lag or a full outbox have already exited
        subscriptions.retain(|_, handle| !handle.is_finished());

        let reply = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Subscribe { market_id }) => {
                subscribe(&state, &mut subscriptions, Topic::Market(market_id), &tx).await
            }
            Ok(ClientMessage::SubscribeUser { user_id }) => {
                subscribe(&state, &mut subscriptions, Topic::User(user_id), &tx).await
            }
            Ok(ClientMessage::Unsubscribe { market_id }) => {
                unsubscribe(&mut subscriptions, Topic::Market(market_id))
            }
            Ok(ClientMessage::UnsubscribeUser { user_id }) => {
                unsubscribe(&mut subscriptions, Topic::User(user_id))
            }
            Ok(ClientMessage::ListSubscriptions) => {
                ServerMessage::subscriptions(subscriptions.keys())
            }
            Err(e) => ServerMessage::error(format!("Invalid request: {}", e)),
        };

        if let Some(json) = to_frame(&reply) {
            if tx.send(json).await.is_err() {
                break;
            }
        }
    }

    // Cleanup
    for (_, handle) in subscriptions.drain() {
        handle.abort();
    }
    drop(tx);
    let _ = send_task.await;
}

async fn subscribe(
    state: &WsState,
    subscriptions: &mut HashMap<Topic, JoinHandle<()>>,
    topic: Topic,
    outbox: &mpsc::Sender<String>,
) -> ServerMessage {
    // Subscribing twice keeps the existing forwarder
    if subscriptions.contains_key(&topic) {
        return ServerMessage::subscribed(topic);
    }
    if subscriptions.len() >= state.max_subscriptions {
        return ServerMessage::error(format!(
            "subscription limit of {} reached",
            state.max_subscriptions
        ));
    }

    let known = match topic {
        Topic::Market(id) => state.ledger.get_market(id).await.map(|m| m.is_some()),
        Topic::User(id) => state.ledger.get_user(id).await.map(|u| u.is_some()),
    };
    match known {
        Ok(true) => {}
        Ok(false) => return ServerMessage::error(format!("{} not found", topic)),
        Err(e) => {
            warn!(?topic, error = %e, "Subscription lookup failed");
            return ServerMessage::error(format!("could not subscribe to {}", topic));
        }
    }

    let subscription = Subscription::open(&state.event_publisher, topic);
    subscriptions.insert(topic, spawn_forwarder(subscription, outbox.clone()));
    ServerMessage::subscribed(topic)
}

fn unsubscribe(subscriptions: &mut HashMap<Topic, JoinHandle<()>>, topic: Topic) -> ServerMessage {
    if let Some(handle) = subscriptions.remove(&topic) {
        handle.abort();
    }
    ServerMessage::unsubscribed(topic)
}

/// One topic's receiver. Dropping it releases the publisher channel,
/// including when the forwarder holding it is aborted.
struct Subscription {
    topic: Topic,
    events: Option<broadcast::Receiver<MarketEvent>>,
    publisher: Arc<BroadcastEventPublisher>,
}

impl Subscription {
    fn open(publisher: &Arc<BroadcastEventPublisher>, topic: Topic) -> Self {
        let events = match topic {
            Topic::Market(id) => publisher.subscribe_market(id),
            Topic::User(id) => publisher.subscribe_user(id),
        };
        Subscription {
            topic,
            events: Some(events),
            publisher: Arc::clone(publisher),
        }
    }

    async fn recv(&mut self) -> Result<MarketEvent, RecvError> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => Err(RecvError::Closed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // The receiver has to be gone before the publisher counts what is left
        drop(self.events.take());
        match self.topic {
            Topic::Market(id) => self.publisher.unsubscribe_market(id),
            Topic::User(id) => self.publisher.unsubscribe_user(id),
        }
    }
}

/// Move events from one broadcast receiver into the connection outbox.
///
/// Never waits on the client: a receiver that lagged or an outbox that is
/// full ends this subscription.
fn spawn_forwarder(mut subscription: Subscription, outbox: mpsc::Sender<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let topic = subscription.topic;
        loop {
            let event = match subscription.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(?topic, skipped, "Subscriber lagged, dropping subscription");
                    notify_dropped(&outbox, topic, "subscriber lagged behind");
                    break;
                }
                Err(RecvError::Closed) => break,
            };

            let Some(json) = to_frame(&event) else {
                continue;
            };
            match outbox.try_send(json) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    debug!(?topic, "Outbox full, dropping subscription");
                    notify_dropped(&outbox, topic, "outbox full");
                    break;
                }
                Err(TrySendError::Closed(_)) => break,
            }
        }
    })
}

/// Best effort: the outbox may still be full.
fn notify_dropped(outbox: &mpsc::Sender<String>, topic: Topic, reason: &str) {
    let message = ServerMessage::error(format!("subscription {:?} dropped: {}", topic, reason));
    if let Some(json) = to_frame(&message) {
        let _ = outbox.try_send(json);
    }
}

fn to_frame<T: Serialize>(message: &T) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(error = %e, "Failed to encode WebSocket frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::EventPublisher;
    use crate::domain::{BalanceUpdateEvent, MarketId, UserId};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn balance(user: u64) -> MarketEvent {
        MarketEvent::BalanceUpdate(BalanceUpdateEvent {
            user_id: UserId::new(user),
            balance: dec!(10),
        })
    }

    #[tokio::test]
    async fn test_forwarder_relays_events() {
        let publisher = Arc::new(BroadcastEventPublisher::new(8));
        let (tx, mut rx) = mpsc::channel(8);
        let subscription = Subscription::open(&publisher, Topic::User(UserId::new(1)));
        let handle = spawn_forwarder(subscription, tx);

        publisher.publish_to_user(UserId::new(1), balance(1)).await;
        let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(frame.contains("\"balance_update\""));

        handle.abort();
        let _ = handle.await;
        assert_eq!(publisher.subscriber_count(), 0);
        assert_eq!(publisher.user_channel_count(), 0);
    }

    #[tokio::test]
    async fn test_full_outbox_drops_subscription() {
        let publisher = Arc::new(BroadcastEventPublisher::new(16));
        let (tx, mut rx) = mpsc::channel(1);
        let subscription = Subscription::open(&publisher, Topic::Market(MarketId::new(1)));
        let handle = spawn_forwarder(subscription, tx);

        // Nobody drains the outbox, so the second event finds it full
        let event = MarketEvent::BalanceUpdate(BalanceUpdateEvent {
            user_id: UserId::new(1),
            balance: dec!(1),
        });
        for _ in 0..3 {
            publisher.publish_to_market(MarketId::new(1), event.clone()).await;
        }

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(publisher.subscriber_count(), 0);
        assert_eq!(publisher.market_channel_count(), 0);
        assert!(rx.recv().await.is_some());
    }
}
