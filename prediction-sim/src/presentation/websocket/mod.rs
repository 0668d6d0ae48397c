mod handler;
mod message;

pub use handler::{DEFAULT_MAX_SUBSCRIPTIONS, DEFAULT_OUTBOX_CAPACITY, WsState, ws_handler};
pub use message::{ClientMessage, ServerMessage, Topic, TopicRef};
