//! Recording chat client for unit tests.

use crate::chat::content::RoomMessage;
use crate::chat::traits::{ChatClient, ChatEventStream, StateEvent};
use crate::error::{ChatError, Result};

use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory chat client that records every call and replies from fixtures.
#[derive(Default)]
pub struct RecordingClient {
    /// `(room_id, content)` for every message sent.
    pub sent: Mutex<Vec<(String, RoomMessage)>>,
    /// `(room_id, event_type, state_key, content)` for every state write.
    pub state_writes: Mutex<Vec<(String, String, String, Value)>>,
    /// `(room_id, event_id, key)` for every reaction.
    pub reactions: Mutex<Vec<(String, String, String)>>,
    /// Rooms joined.
    pub joins: Mutex<Vec<String>>,
    /// `(room_id, user_id, reason)` for every kick.
    pub kicks: Mutex<Vec<(String, String, String)>>,

    /// Fixture: rooms returned by `joined_rooms`.
    pub joined: Mutex<Vec<String>>,
    /// Fixture: per-room state returned by `room_state`.
    pub room_states: Mutex<HashMap<String, Vec<StateEvent>>>,
    /// Fixture: `(event_type, state_key) -> content` for `room_state_event`.
    pub state_contents: Mutex<HashMap<(String, String), Value>>,

    /// When set, message sends fail.
    pub fail_sends: AtomicBool,
    /// When set, state writes fail with a 403.
    pub deny_state_writes: AtomicBool,

    next_event_id: AtomicUsize,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bodies of all messages sent to `room_id`, in order.
    pub fn bodies_for(&self, room_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(room, _)| room == room_id)
            .map(|(_, content)| content.body.clone())
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl ChatClient for RecordingClient {
    async fn whoami(&self) -> Result<String> {
        Ok("@figma:example.com".to_string())
    }

    async fn joined_rooms(&self) -> Result<Vec<String>> {
        Ok(self.joined.lock().clone())
    }

    async fn room_state(&self, room_id: &str) -> Result<Vec<StateEvent>> {
        self.room_states
            .lock()
            .get(room_id)
            .cloned()
            .ok_or_else(|| ChatError::Http { status: 404, body: "no state".into() }.into())
    }

    async fn room_state_event(
        &self,
        _room_id: &str,
        event_type: &str,
        state_key: &str,
    ) -> Result<Value> {
        self.state_contents
            .lock()
            .get(&(event_type.to_string(), state_key.to_string()))
            .cloned()
            .ok_or_else(|| ChatError::Http { status: 404, body: "no event".into() }.into())
    }

    async fn send_state_event(
        &self,
        room_id: &str,
        event_type: &str,
        state_key: &str,
        content: Value,
    ) -> Result<()> {
        if self.deny_state_writes.load(Ordering::SeqCst) {
            return Err(ChatError::Http { status: 403, body: "M_FORBIDDEN".into() }.into());
        }
        self.state_writes.lock().push((
            room_id.to_string(),
            event_type.to_string(),
            state_key.to_string(),
            content,
        ));
        Ok(())
    }

    async fn send_message(&self, room_id: &str, content: &RoomMessage) -> Result<String> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ChatError::Http { status: 403, body: "M_FORBIDDEN".into() }.into());
        }
        self.sent.lock().push((room_id.to_string(), content.clone()));
        let n = self.next_event_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("$event{n}"))
    }

    async fn react(&self, room_id: &str, event_id: &str, key: &str) -> Result<()> {
        self.reactions
            .lock()
            .push((room_id.to_string(), event_id.to_string(), key.to_string()));
        Ok(())
    }

    async fn join_room(&self, room_id: &str) -> Result<()> {
        self.joins.lock().push(room_id.to_string());
        Ok(())
    }

    async fn kick_user(&self, room_id: &str, user_id: &str, reason: &str) -> Result<()> {
        self.kicks.lock().push((
            room_id.to_string(),
            user_id.to_string(),
            reason.to_string(),
        ));
        Ok(())
    }

    async fn start(&self) -> Result<ChatEventStream> {
        Ok(Box::pin(futures::stream::pending::<crate::chat::traits::ChatEvent>()))
    }
}
