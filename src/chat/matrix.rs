//! Matrix client-server API implementation of the chat capability.

use crate::chat::content::{ReactionContent, RoomMessage};
use crate::chat::traits::{ChatClient, ChatEvent, ChatEventStream, MessageEvent, StateEvent};
use crate::config::MatrixConfig;
use crate::error::{ChatError, Result};

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;

/// Long-poll timeout for `/sync`, in milliseconds.
const SYNC_TIMEOUT_MS: u32 = 30_000;

/// Events older than this (per `unsigned.age`) are replays from before the
/// process started and are dropped instead of dispatched.
const MAX_EVENT_AGE_MS: u64 = 15_000;

/// Delay before retrying a failed `/sync` request.
const SYNC_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Thin Matrix client over the client-server API v3.
#[derive(Clone)]
pub struct MatrixClient {
    http: reqwest::Client,
    homeserver_url: String,
    access_token: String,
}

#[derive(Deserialize)]
struct WhoamiResponse {
    user_id: String,
}

#[derive(Deserialize)]
struct JoinedRoomsResponse {
    joined_rooms: Vec<String>,
}

#[derive(Deserialize)]
struct EventIdResponse {
    event_id: String,
}

#[derive(Deserialize)]
struct SyncResponse {
    next_batch: String,
    #[serde(default)]
    rooms: SyncRooms,
}

#[derive(Default, Deserialize)]
struct SyncRooms {
    #[serde(default)]
    join: HashMap<String, JoinedRoomSync>,
    #[serde(default)]
    invite: HashMap<String, InvitedRoomSync>,
}

#[derive(Default, Deserialize)]
struct JoinedRoomSync {
    #[serde(default)]
    state: EventBatch,
    #[serde(default)]
    timeline: EventBatch,
}

#[derive(Default, Deserialize)]
struct InvitedRoomSync {
    #[serde(default)]
    invite_state: EventBatch,
}

#[derive(Default, Deserialize)]
struct EventBatch {
    #[serde(default)]
    events: Vec<Value>,
}

impl MatrixClient {
    pub fn new(config: &MatrixConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            homeserver_url: config.homeserver_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/_matrix/client/v3/{path}", self.homeserver_url)
    }

    /// Map non-2xx responses to `ChatError::Http` with the response body.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ChatError::Http { status: status.as_u16(), body }.into())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.endpoint(path))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(ChatError::from)?;
        let response = Self::check(response).await?;
        Ok(response.json().await.map_err(ChatError::from)?)
    }

    async fn put_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<T> {
        let response = self
            .http
            .put(self.endpoint(path))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(ChatError::from)?;
        let response = Self::check(response).await?;
        Ok(response.json().await.map_err(ChatError::from)?)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(ChatError::from)?;
        Self::check(response).await?;
        Ok(())
    }

    /// Long-poll `/sync` forever, forwarding dispatched events into `tx`.
    /// Returns when the receiving side goes away.
    async fn sync_loop(self, user_id: String, tx: tokio::sync::mpsc::Sender<ChatEvent>) {
        let mut since: Option<String> = None;
        loop {
            let mut request = self
                .http
                .get(self.endpoint("sync"))
                .bearer_auth(&self.access_token)
                .query(&[("timeout", SYNC_TIMEOUT_MS.to_string())]);
            if let Some(token) = &since {
                request = request.query(&[("since", token.as_str())]);
            }

            let response = match request.send().await {
                Ok(response) => Self::check(response).await,
                Err(error) => Err(ChatError::from(error).into()),
            };
            let sync: SyncResponse = match response {
                Ok(response) => match response.json().await {
                    Ok(sync) => sync,
                    Err(error) => {
                        tracing::warn!(%error, "failed to decode sync response, retrying");
                        tokio::time::sleep(SYNC_RETRY_DELAY).await;
                        continue;
                    }
                },
                Err(error) => {
                    tracing::warn!(%error, "sync request failed, retrying");
                    tokio::time::sleep(SYNC_RETRY_DELAY).await;
                    continue;
                }
            };

            // The first response is a snapshot of history the bootstrap sync
            // already consumed; only take its batch token.
            let initial = since.is_none();
            since = Some(sync.next_batch);
            if initial {
                continue;
            }

            for event in dispatch_sync(&sync.rooms, &user_id) {
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Flatten a sync response into dispatchable chat events.
fn dispatch_sync(rooms: &SyncRooms, user_id: &str) -> Vec<ChatEvent> {
    let mut events = Vec::new();

    for (room_id, joined) in &rooms.join {
        for raw in joined.state.events.iter().chain(joined.timeline.events.iter()) {
            if let Some(event) = dispatch_room_event(room_id, raw) {
                events.push(event);
            }
        }
    }

    for (room_id, invited) in &rooms.invite {
        for raw in &invited.invite_state.events {
            let membership_for_us = raw["type"] == "m.room.member"
                && raw["state_key"] == user_id
                && raw["content"]["membership"] == "invite";
            if membership_for_us {
                events.push(ChatEvent::Invite {
                    room_id: room_id.clone(),
                    sender: raw["sender"].as_str().unwrap_or_default().to_string(),
                });
            }
        }
    }

    events
}

/// Classify one raw joined-room event as a state or message event.
fn dispatch_room_event(room_id: &str, raw: &Value) -> Option<ChatEvent> {
    let age = raw["unsigned"]["age"].as_u64().unwrap_or(0);
    if age > MAX_EVENT_AGE_MS {
        tracing::debug!(room_id, age, "ignoring old event");
        return None;
    }

    if raw.get("state_key").is_some() {
        let event: StateEvent = serde_json::from_value(raw.clone()).ok()?;
        return Some(ChatEvent::State { room_id: room_id.to_string(), event });
    }

    if raw["type"] == "m.room.message" {
        let event: MessageEvent = serde_json::from_value(raw.clone()).ok()?;
        return Some(ChatEvent::Message { room_id: room_id.to_string(), event });
    }

    None
}

fn encode(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

fn txn_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ChatClient for MatrixClient {
    async fn whoami(&self) -> Result<String> {
        let response: WhoamiResponse = self.get_json("account/whoami").await?;
        Ok(response.user_id)
    }

    async fn joined_rooms(&self) -> Result<Vec<String>> {
        let response: JoinedRoomsResponse = self.get_json("joined_rooms").await?;
        Ok(response.joined_rooms)
    }

    async fn room_state(&self, room_id: &str) -> Result<Vec<StateEvent>> {
        self.get_json(&format!("rooms/{}/state", encode(room_id))).await
    }

    async fn room_state_event(
        &self,
        room_id: &str,
        event_type: &str,
        state_key: &str,
    ) -> Result<Value> {
        self.get_json(&format!(
            "rooms/{}/state/{}/{}",
            encode(room_id),
            encode(event_type),
            encode(state_key)
        ))
        .await
    }

    async fn send_state_event(
        &self,
        room_id: &str,
        event_type: &str,
        state_key: &str,
        content: Value,
    ) -> Result<()> {
        let _: Value = self
            .put_json(
                &format!(
                    "rooms/{}/state/{}/{}",
                    encode(room_id),
                    encode(event_type),
                    encode(state_key)
                ),
                &content,
            )
            .await?;
        Ok(())
    }

    async fn send_message(&self, room_id: &str, content: &RoomMessage) -> Result<String> {
        let response: EventIdResponse = self
            .put_json(
                &format!("rooms/{}/send/m.room.message/{}", encode(room_id), txn_id()),
                content,
            )
            .await?;
        Ok(response.event_id)
    }

    async fn react(&self, room_id: &str, event_id: &str, key: &str) -> Result<()> {
        let _: EventIdResponse = self
            .put_json(
                &format!("rooms/{}/send/m.reaction/{}", encode(room_id), txn_id()),
                &ReactionContent::new(event_id, key),
            )
            .await?;
        Ok(())
    }

    async fn join_room(&self, room_id: &str) -> Result<()> {
        self.post_json(&format!("join/{}", encode(room_id)), &serde_json::json!({}))
            .await
    }

    async fn kick_user(&self, room_id: &str, user_id: &str, reason: &str) -> Result<()> {
        self.post_json(
            &format!("rooms/{}/kick", encode(room_id)),
            &serde_json::json!({ "user_id": user_id, "reason": reason }),
        )
        .await
    }

    async fn start(&self) -> Result<ChatEventStream> {
        let user_id = self.whoami().await?;
        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let client = self.clone();
        tokio::spawn(client.sync_loop(user_id, tx));
        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined_room(events: Vec<Value>) -> SyncRooms {
        let mut join = HashMap::new();
        join.insert(
            "!room:example.com".to_string(),
            JoinedRoomSync {
                state: EventBatch::default(),
                timeline: EventBatch { events },
            },
        );
        SyncRooms { join, invite: HashMap::new() }
    }

    #[test]
    fn message_events_dispatch_with_body() {
        let rooms = joined_room(vec![serde_json::json!({
            "type": "m.room.message",
            "event_id": "$msg",
            "sender": "@alice:example.com",
            "content": {"msgtype": "m.text", "body": "figma track AbCd"}
        })]);

        let events = dispatch_sync(&rooms, "@bot:example.com");
        assert_eq!(events.len(), 1);
        let ChatEvent::Message { room_id, event } = &events[0] else {
            panic!("expected message event");
        };
        assert_eq!(room_id, "!room:example.com");
        assert_eq!(event.content.body, "figma track AbCd");
    }

    #[test]
    fn old_events_are_dropped() {
        let rooms = joined_room(vec![serde_json::json!({
            "type": "m.room.message",
            "event_id": "$msg",
            "sender": "@alice:example.com",
            "unsigned": {"age": 60_000},
            "content": {"body": "hello"}
        })]);

        assert!(dispatch_sync(&rooms, "@bot:example.com").is_empty());
    }

    #[test]
    fn invites_only_dispatch_for_own_membership() {
        let mut invite = HashMap::new();
        invite.insert(
            "!invited:example.com".to_string(),
            InvitedRoomSync {
                invite_state: EventBatch {
                    events: vec![
                        serde_json::json!({
                            "type": "m.room.member",
                            "state_key": "@someone:example.com",
                            "sender": "@admin:example.com",
                            "content": {"membership": "join"}
                        }),
                        serde_json::json!({
                            "type": "m.room.member",
                            "state_key": "@bot:example.com",
                            "sender": "@admin:example.com",
                            "content": {"membership": "invite"}
                        }),
                    ],
                },
            },
        );
        let rooms = SyncRooms { join: HashMap::new(), invite };

        let events = dispatch_sync(&rooms, "@bot:example.com");
        assert_eq!(events.len(), 1);
        let ChatEvent::Invite { room_id, sender } = &events[0] else {
            panic!("expected invite event");
        };
        assert_eq!(room_id, "!invited:example.com");
        assert_eq!(sender, "@admin:example.com");
    }

    #[test]
    fn state_events_dispatch_as_state() {
        let rooms = joined_room(vec![serde_json::json!({
            "type": "uk.half-shot.matrix-figma.file",
            "state_key": "AbCd",
            "sender": "@admin:example.com",
            "content": {"fileId": "AbCd"}
        })]);

        let events = dispatch_sync(&rooms, "@bot:example.com");
        assert_eq!(events.len(), 1);
        let ChatEvent::State { event, .. } = &events[0] else {
            panic!("expected state event");
        };
        assert_eq!(event.state_key, "AbCd");
    }
}
