//! Startup synchronization against persisted room state.

use crate::chat::traits::ChatClientDyn;
use crate::room::{FigmaFileRoom, GlobalConfig, TrackedFile, FILE_STATE_TYPE, GLOBAL_CONFIG_STATE_TYPE};
use crate::router::{Router, SharedGlobalConfig};

use std::sync::Arc;
use std::time::Duration;

/// Delay between attempts in the startup retry loops.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Reconstruct tracked rooms from the already-joined rooms' state.
///
/// The joined-rooms listing is retried forever; per-room state failures are
/// logged and skipped so one broken room cannot block startup.
pub async fn sync_rooms(client: &Arc<dyn ChatClientDyn>, router: &Router) {
    let joined = loop {
        match client.joined_rooms().await {
            Ok(joined) => break joined,
            Err(error) => {
                tracing::warn!(%error, "could not get joined rooms, retrying in 5s");
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    };

    for room_id in joined {
        let state = match client.room_state(&room_id).await {
            Ok(state) => state,
            Err(error) => {
                tracing::warn!(%error, room_id, "couldn't get room state, skipping");
                continue;
            }
        };
        for event in state {
            if event.event_type != FILE_STATE_TYPE {
                continue;
            }
            let tracked: TrackedFile = match serde_json::from_value(event.content) {
                Ok(tracked) => tracked,
                Err(error) => {
                    tracing::warn!(%error, room_id, "skipping malformed file state event");
                    continue;
                }
            };
            tracing::info!(room_id, file_id = %tracked.file_id, "created new room from state");
            router
                .add_room(FigmaFileRoom::new(
                    room_id.clone(),
                    event.state_key,
                    tracked,
                    client.clone(),
                ))
                .await;
        }
    }
}

/// Join the admin room and read the global config, retrying forever.
///
/// The bridge is not considered configured until this returns; the event
/// stream and webhook listener are started only afterwards.
pub async fn load_global_config(
    client: &Arc<dyn ChatClientDyn>,
    admin_room: &str,
    global_config: &SharedGlobalConfig,
) {
    loop {
        let result = async {
            client.join_room(admin_room).await?;
            client
                .room_state_event(admin_room, GLOBAL_CONFIG_STATE_TYPE, "")
                .await
        }
        .await;

        match result.and_then(|content| {
            serde_json::from_value::<GlobalConfig>(content).map_err(Into::into)
        }) {
            Ok(config) => {
                tracing::info!(admin_users = config.admin_users.len(), "global config loaded");
                *global_config.write().await = Some(config);
                return;
            }
            Err(error) => {
                tracing::error!(
                    %error,
                    admin_room,
                    "could not start, waiting for {GLOBAL_CONFIG_STATE_TYPE} to be defined; retrying in 5s"
                );
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}
