//! Room registry and routing between chat events and webhook payloads.

use crate::chat::content::RoomMessage;
use crate::chat::traits::{ChatClientDyn, MessageEvent, StateEvent};
use crate::commands::parse_track_command;
use crate::error::Result;
use crate::payload::CommentPayload;
use crate::room::{
    FigmaFileRoom, GlobalConfig, TrackedFile, FILE_STATE_TYPE, GLOBAL_CONFIG_STATE_TYPE,
};

use std::sync::Arc;
use tokio::sync::RwLock;

/// Latest global admin configuration, shared with the invite gatekeeper.
pub type SharedGlobalConfig = Arc<RwLock<Option<GlobalConfig>>>;

/// Webhook deliveries older than this are duplicate/late replays; the
/// upstream offers no change-delta signal, so the timestamp is the only
/// dedupe heuristic available.
const STALENESS_WINDOW_MS: i64 = 5_000;

const PERMISSION_NOTICE: &str = "Sorry, I need permission to send state events in order to \
    start tracking. You can revoke the permission afterwards.";

/// Owns the tracked-room collection and routes everything to it.
///
/// The collection is mutated only from the single chat-event stream; the
/// webhook path takes read snapshots and touches per-room comment maps only.
pub struct Router {
    client: Arc<dyn ChatClientDyn>,
    rooms: RwLock<Vec<Arc<FigmaFileRoom>>>,
    catch_all: Arc<FigmaFileRoom>,
    global_config: SharedGlobalConfig,
    self_user_id: String,
    admin_room: String,
}

impl Router {
    pub fn new(
        client: Arc<dyn ChatClientDyn>,
        self_user_id: impl Into<String>,
        admin_room: impl Into<String>,
        global_config: SharedGlobalConfig,
    ) -> Self {
        let admin_room = admin_room.into();
        // Comments on untracked files land in the admin room.
        let catch_all = Arc::new(FigmaFileRoom::new(
            admin_room.clone(),
            "",
            TrackedFile::default(),
            client.clone(),
        ));
        Self {
            client,
            rooms: RwLock::new(Vec::new()),
            catch_all,
            global_config,
            self_user_id: self_user_id.into(),
            admin_room,
        }
    }

    /// Register a reconstructed room. Used by the startup sync; rooms created
    /// at runtime go through [`Router::on_room_state_event`].
    pub async fn add_room(&self, room: FigmaFileRoom) {
        self.rooms.write().await.push(Arc::new(room));
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Handle a room state change: file-tracking events create or update
    /// tracked rooms, global-config events in the admin room replace the
    /// admin list. Everything else is ignored.
    pub async fn on_room_state_event(&self, room_id: &str, event: &StateEvent) -> Result<()> {
        if event.event_type == FILE_STATE_TYPE && !event.state_key.is_empty() {
            let state: TrackedFile = serde_json::from_value(event.content.clone())?;

            {
                let rooms = self.rooms.read().await;
                let existing = rooms
                    .iter()
                    .find(|room| room.room_id() == room_id && room.state_key() == event.state_key);
                if let Some(existing) = existing {
                    tracing::info!(
                        room_id,
                        state_key = %event.state_key,
                        file_id = %state.file_id,
                        "updating state for existing room"
                    );
                    existing.update_state(state).await;
                    return Ok(());
                }
            }

            tracing::info!(
                room_id,
                state_key = %event.state_key,
                file_id = %state.file_id,
                "created new room from state"
            );
            let announce = RoomMessage::notice(format!("Excellent! I am tracking {}.", state.file_id));
            if let Err(error) = self.client.send_message(room_id, &announce).await {
                tracing::warn!(%error, room_id, "failed to announce tracking");
            }
            self.rooms.write().await.push(Arc::new(FigmaFileRoom::new(
                room_id,
                event.state_key.clone(),
                state,
                self.client.clone(),
            )));
        } else if event.event_type == GLOBAL_CONFIG_STATE_TYPE
            && event.state_key.is_empty()
            && room_id == self.admin_room
        {
            let config: GlobalConfig = serde_json::from_value(event.content.clone())?;
            tracing::info!(admin_users = config.admin_users.len(), "updating global config");
            *self.global_config.write().await = Some(config);
        }
        Ok(())
    }

    /// Handle a room message: in untracked rooms, a tracking command writes
    /// the file state event and waits for its echo to construct the room;
    /// in tracked rooms the message is forwarded to each binding.
    pub async fn on_room_message(&self, room_id: &str, event: &MessageEvent) -> Result<()> {
        if event.sender == self.self_user_id || event.content.body.is_empty() {
            return Ok(());
        }

        let matching: Vec<Arc<FigmaFileRoom>> = self
            .rooms
            .read()
            .await
            .iter()
            .filter(|room| room.room_id() == room_id)
            .cloned()
            .collect();

        if matching.is_empty() {
            let Some(file_id) = parse_track_command(&event.content.body) else {
                return Ok(());
            };
            match FigmaFileRoom::create_state(self.client.as_ref(), room_id, file_id).await {
                Ok(()) => {
                    // The state event echoes back through sync and creates
                    // the room there; constructing it here as well would
                    // race that echo.
                    self.client.react(room_id, &event.event_id, "✅").await?;
                }
                Err(error) => {
                    tracing::warn!(%error, room_id, "tracking state event rejected");
                    self.client
                        .send_message(room_id, &RoomMessage::notice(PERMISSION_NOTICE))
                        .await?;
                    self.client.react(room_id, &event.event_id, "❌").await?;
                }
            }
            return Ok(());
        }

        for room in matching {
            room.on_message_event(event).await?;
        }
        Ok(())
    }

    /// Route one webhook payload: drop malformed and stale deliveries, fan
    /// out to every room tracking the file, or fall back to the catch-all.
    pub async fn on_webhook(&self, payload: CommentPayload) {
        if payload.is_malformed() {
            tracing::debug!("dropping webhook payload with missing fields");
            return;
        }
        let Some(created_at) = payload.created_at() else {
            tracing::warn!(
                comment_id = %payload.comment_id,
                "dropping webhook payload with unparsable created_at"
            );
            return;
        };
        let age = chrono::Utc::now() - created_at;
        if age > chrono::Duration::milliseconds(STALENESS_WINDOW_MS) {
            tracing::info!(comment_id = %payload.comment_id, "comment is stale, ignoring");
            return;
        }

        let mut targets = Vec::new();
        {
            let rooms = self.rooms.read().await;
            for room in rooms.iter() {
                if room.file_id().await == payload.file_key {
                    targets.push(room.clone());
                }
            }
        }

        if targets.is_empty() {
            if let Err(error) = self.catch_all.handle_new_comment(&payload).await {
                tracing::warn!(%error, "failed to relay comment to catch-all room");
            }
            return;
        }

        // Independent fan-out: one failing room must not block the rest.
        futures::future::join_all(targets.iter().map(|room| async {
            if let Err(error) = room.handle_new_comment(&payload).await {
                tracing::warn!(%error, room_id = room.room_id(), "failed to relay comment");
            }
        }))
        .await;
    }
}
