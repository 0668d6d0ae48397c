use crate::domain::{MarketId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// WebSocket incoming message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Market updates and candles for one market
    #[serde(rename_all = "camelCase")]
    Subscribe { market_id: MarketId },
    #[serde(rename_all = "camelCase")]
    Unsubscribe { market_id: MarketId },
    /// Balance updates for one user
    #[serde(rename_all = "camelCase")]
    SubscribeUser { user_id: UserId },
    #[serde(rename_all = "camelCase")]
    UnsubscribeUser { user_id: UserId },
    ListSubscriptions,
}

/// A channel a connection can listen on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    Market(MarketId),
    User(UserId),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Market(id) => write!(f, "market {}", id),
            Topic::User(id) => write!(f, "user {}", id),
        }
    }
}

/// WebSocket reply message. Events themselves are sent as `MarketEvent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Subscribed(TopicRef),
    Unsubscribed(TopicRef),
    #[serde(rename_all = "camelCase")]
    Subscriptions {
        market_ids: Vec<MarketId>,
        user_ids: Vec<UserId>,
    },
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_id: Option<MarketId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl From<Topic> for TopicRef {
    fn from(topic: Topic) -> Self {
        match topic {
            Topic::Market(id) => TopicRef {
                market_id: Some(id),
                user_id: None,
            },
            Topic::User(id) => TopicRef {
                market_id: None,
                user_id: Some(id),
            },
        }
    }
}

impl ServerMessage {
    pub fn subscribed(topic: Topic) -> Self {
        ServerMessage::Subscribed(topic.into())
    }

    pub fn unsubscribed(topic: Topic) -> Self {
        ServerMessage::Unsubscribed(topic.into())
    }

    /// Sorted listing of the given topics
    pub fn subscriptions<'a>(topics: impl IntoIterator<Item = &'a Topic>) -> Self {
        let mut market_ids = Vec::new();
        let mut user_ids = Vec::new();
        for topic in topics {
            match topic {
                Topic::Market(id) => market_ids.push(*id),
                Topic::User(id) => user_ids.push(*id),
            }
        }
        market_ids.sort();
        user_ids.sort();
        ServerMessage::Subscriptions {
            market_ids,
            user_ids,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_client_messages() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "subscribe", "marketId": 4})).unwrap();
        assert_eq!(msg, ClientMessage::Subscribe { market_id: MarketId::new(4) });

        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "unsubscribe_user", "userId": 2})).unwrap();
        assert_eq!(msg, ClientMessage::UnsubscribeUser { user_id: UserId::new(2) });

        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "list_subscriptions"})).unwrap();
        assert_eq!(msg, ClientMessage::ListSubscriptions);

        assert!(serde_json::from_value::<ClientMessage>(json!({"type": "subscribe"})).is_err());
    }

    #[test]
    fn test_server_message_shapes() {
        assert_eq!(
            serde_json::to_value(ServerMessage::subscribed(Topic::Market(MarketId::new(4))))
                .unwrap(),
            json!({"type": "subscribed", "marketId": 4})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::unsubscribed(Topic::User(UserId::new(2))))
                .unwrap(),
            json!({"type": "unsubscribed", "userId": 2})
        );

        let topics = [
            Topic::User(UserId::new(2)),
            Topic::Market(MarketId::new(9)),
            Topic::Market(MarketId::new(1)),
        ];
        assert_eq!(
            serde_json::to_value(ServerMessage::subscriptions(&topics)).unwrap(),
            json!({"type": "subscriptions", "marketIds": [1, 9], "userIds": [2]})
        );
    }
}
