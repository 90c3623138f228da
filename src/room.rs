//! Per-room binding of a tracked Figma file, persisted via room state.

use crate::chat::content::RoomMessage;
use crate::chat::traits::{ChatClientDyn, MessageEvent};
use crate::error::Result;
use crate::format::format_comment;
use crate::payload::CommentPayload;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// State event type binding a room to a tracked Figma file.
pub const FILE_STATE_TYPE: &str = "uk.half-shot.matrix-figma.file";

/// State event type carrying the global admin configuration.
pub const GLOBAL_CONFIG_STATE_TYPE: &str = "uk.half-shot.matrix-figma.globalconfig";

/// Content of a file-tracking state event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedFile {
    #[serde(rename = "fileId", default)]
    pub file_id: String,
}

/// Content of the global-config state event in the admin room.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(rename = "adminUsers", default)]
    pub admin_users: Vec<String>,
}

/// Record of a relayed comment, kept for reply threading.
#[derive(Debug, Clone)]
pub struct SentComment {
    pub content: RoomMessage,
    pub event_id: String,
    pub sender: String,
}

/// A chat room bound to one tracked Figma file.
///
/// Identity is `(room_id, state_key)` and never changes; the tracked file is
/// replaced wholesale on state updates. The comment map grows for the
/// process lifetime; entries are never evicted.
pub struct FigmaFileRoom {
    room_id: String,
    state_key: String,
    state: RwLock<TrackedFile>,
    comments: Mutex<HashMap<String, SentComment>>,
    client: Arc<dyn ChatClientDyn>,
}

impl FigmaFileRoom {
    pub fn new(
        room_id: impl Into<String>,
        state_key: impl Into<String>,
        state: TrackedFile,
        client: Arc<dyn ChatClientDyn>,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            state_key: state_key.into(),
            state: RwLock::new(state),
            comments: Mutex::new(HashMap::new()),
            client,
        }
    }

    /// Write the file-tracking state event that makes a room a Figma room.
    /// The room object itself is only constructed once the event echoes
    /// back through sync, so tracking never double-creates.
    pub async fn create_state(
        client: &dyn ChatClientDyn,
        room_id: &str,
        file_id: &str,
    ) -> Result<()> {
        let state = TrackedFile { file_id: file_id.to_string() };
        client
            .send_state_event(room_id, FILE_STATE_TYPE, file_id, serde_json::to_value(state)?)
            .await
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn state_key(&self) -> &str {
        &self.state_key
    }

    pub async fn file_id(&self) -> String {
        self.state.read().await.file_id.clone()
    }

    /// Replace the tracked file wholesale.
    pub async fn update_state(&self, state: TrackedFile) {
        *self.state.write().await = state;
    }

    /// Reserved extension point for per-message behavior in tracked rooms.
    pub async fn on_message_event(&self, _event: &MessageEvent) -> Result<()> {
        Ok(())
    }

    /// Format, thread, send, and record one comment.
    ///
    /// Not idempotent: the same comment id delivered twice sends twice and
    /// the later record wins. The staleness filter upstream is the only
    /// guard against duplicate deliveries. A failed send propagates without
    /// recording anything.
    pub async fn handle_new_comment(&self, payload: &CommentPayload) -> Result<()> {
        // The map lock is held across the send so a parent comment is
        // recorded before any sibling delivery tries to resolve it.
        let mut comments = self.comments.lock().await;
        let parent = if payload.parent_id.is_empty() {
            None
        } else {
            comments.get(&payload.parent_id)
        };

        let content = format_comment(payload, parent);
        let event_id = self.client.send_message(&self.room_id, &content).await?;

        comments.insert(
            payload.comment_id.clone(),
            SentComment {
                content,
                event_id,
                sender: payload.triggered_by.id.clone(),
            },
        );
        Ok(())
    }
}
