//! Chat capability trait and dynamic dispatch companion.

use crate::chat::content::RoomMessage;
use crate::error::Result;
use futures::Stream;
use serde::Deserialize;
use serde_json::Value;
use std::pin::Pin;

/// Chat event stream type.
pub type ChatEventStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;

/// Events surfaced from the chat backend sync stream.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// A room message (non-state timeline event with a text body).
    Message { room_id: String, event: MessageEvent },
    /// A room state change.
    State { room_id: String, event: StateEvent },
    /// An invite for the bridge user.
    Invite { room_id: String, sender: String },
}

/// Timeline message event, reduced to the fields the bridge consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub content: MessageEventContent,
}

/// Content of a timeline message event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEventContent {
    #[serde(default)]
    pub body: String,
}

/// Room state event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub state_key: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub content: Value,
}

/// Static trait for the chat backend capability.
/// Use this for type-safe implementations.
pub trait ChatClient: Send + Sync + 'static {
    /// Resolve the user id the client is authenticated as.
    fn whoami(&self) -> impl std::future::Future<Output = Result<String>> + Send;

    /// List currently joined room ids.
    fn joined_rooms(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Fetch the full persisted state of a room.
    fn room_state(
        &self,
        room_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<StateEvent>>> + Send;

    /// Fetch one state event's content by type and state key.
    fn room_state_event(
        &self,
        room_id: &str,
        event_type: &str,
        state_key: &str,
    ) -> impl std::future::Future<Output = Result<Value>> + Send;

    /// Write a state event.
    fn send_state_event(
        &self,
        room_id: &str,
        event_type: &str,
        state_key: &str,
        content: Value,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Send a room message; resolves to the sent event id.
    fn send_message(
        &self,
        room_id: &str,
        content: &RoomMessage,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// React to an event with an emoji annotation.
    fn react(
        &self,
        room_id: &str,
        event_id: &str,
        key: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Join a room by id or alias.
    fn join_room(&self, room_id: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Kick a user from a room with a reason.
    fn kick_user(
        &self,
        room_id: &str,
        user_id: &str,
        reason: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Start the sync loop and return the inbound event stream.
    fn start(&self) -> impl std::future::Future<Output = Result<ChatEventStream>> + Send;
}

/// Dynamic trait for runtime polymorphism.
/// Use this when you need `Arc<dyn ChatClientDyn>` shared across components.
pub trait ChatClientDyn: Send + Sync + 'static {
    fn whoami<'a>(&'a self) -> Pin<Box<dyn std::future::Future<Output = Result<String>> + Send + 'a>>;

    fn joined_rooms<'a>(
        &'a self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<String>>> + Send + 'a>>;

    fn room_state<'a>(
        &'a self,
        room_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<StateEvent>>> + Send + 'a>>;

    fn room_state_event<'a>(
        &'a self,
        room_id: &'a str,
        event_type: &'a str,
        state_key: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Value>> + Send + 'a>>;

    fn send_state_event<'a>(
        &'a self,
        room_id: &'a str,
        event_type: &'a str,
        state_key: &'a str,
        content: Value,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;

    fn send_message<'a>(
        &'a self,
        room_id: &'a str,
        content: &'a RoomMessage,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String>> + Send + 'a>>;

    fn react<'a>(
        &'a self,
        room_id: &'a str,
        event_id: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;

    fn join_room<'a>(
        &'a self,
        room_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;

    fn kick_user<'a>(
        &'a self,
        room_id: &'a str,
        user_id: &'a str,
        reason: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>>;

    fn start<'a>(
        &'a self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ChatEventStream>> + Send + 'a>>;
}

/// Blanket implementation: any type implementing ChatClient automatically
/// implements ChatClientDyn.
impl<T: ChatClient> ChatClientDyn for T {
    fn whoami<'a>(&'a self) -> Pin<Box<dyn std::future::Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(ChatClient::whoami(self))
    }

    fn joined_rooms<'a>(
        &'a self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<String>>> + Send + 'a>> {
        Box::pin(ChatClient::joined_rooms(self))
    }

    fn room_state<'a>(
        &'a self,
        room_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Vec<StateEvent>>> + Send + 'a>> {
        Box::pin(ChatClient::room_state(self, room_id))
    }

    fn room_state_event<'a>(
        &'a self,
        room_id: &'a str,
        event_type: &'a str,
        state_key: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Value>> + Send + 'a>> {
        Box::pin(ChatClient::room_state_event(self, room_id, event_type, state_key))
    }

    fn send_state_event<'a>(
        &'a self,
        room_id: &'a str,
        event_type: &'a str,
        state_key: &'a str,
        content: Value,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(ChatClient::send_state_event(self, room_id, event_type, state_key, content))
    }

    fn send_message<'a>(
        &'a self,
        room_id: &'a str,
        content: &'a RoomMessage,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(ChatClient::send_message(self, room_id, content))
    }

    fn react<'a>(
        &'a self,
        room_id: &'a str,
        event_id: &'a str,
        key: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(ChatClient::react(self, room_id, event_id, key))
    }

    fn join_room<'a>(
        &'a self,
        room_id: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(ChatClient::join_room(self, room_id))
    }

    fn kick_user<'a>(
        &'a self,
        room_id: &'a str,
        user_id: &'a str,
        reason: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(ChatClient::kick_user(self, room_id, user_id, reason))
    }

    fn start<'a>(
        &'a self,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ChatEventStream>> + Send + 'a>> {
        Box::pin(ChatClient::start(self))
    }
}
