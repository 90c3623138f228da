//! Invite gatekeeping against the admin user list.

use crate::chat::content::RoomMessage;
use crate::chat::traits::ChatClientDyn;
use crate::error::Result;
use crate::router::SharedGlobalConfig;

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

const KICK_REASON: &str = "User is not on the permitted admin user list";

const ONBOARDING_NOTICE: &str = "Hello 👋. Please give me moderator permissions, and say \
    `figma track <fileId>` to start tracking comments for a file.";

/// Accepts or rejects room invites based on the global admin list.
pub struct InviteGatekeeper {
    client: Arc<dyn ChatClientDyn>,
    global_config: SharedGlobalConfig,
    self_user_id: String,
    /// Rooms joined this process lifetime, to send the onboarding notice
    /// only on a first-time join.
    joined: Mutex<HashSet<String>>,
}

impl InviteGatekeeper {
    pub fn new(
        client: Arc<dyn ChatClientDyn>,
        global_config: SharedGlobalConfig,
        self_user_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            global_config,
            self_user_id: self_user_id.into(),
            joined: Mutex::new(HashSet::new()),
        }
    }

    /// Handle one room invite. Invites arriving before the global config is
    /// loaded are dropped; there is no retry for them.
    pub async fn on_invite(&self, room_id: &str, sender: &str) -> Result<()> {
        let is_admin = {
            let config = self.global_config.read().await;
            let Some(config) = config.as_ref() else {
                // Still starting up, ignore.
                return Ok(());
            };
            config.admin_users.iter().any(|user| user == sender)
        };

        if !is_admin {
            tracing::warn!(room_id, sender, "rejecting invite from non-admin");
            self.client
                .kick_user(room_id, &self.self_user_id, KICK_REASON)
                .await?;
            return Ok(());
        }

        self.client.join_room(room_id).await?;
        let first_join = self.joined.lock().await.insert(room_id.to_string());
        if first_join {
            self.client
                .send_message(room_id, &RoomMessage::notice(ONBOARDING_NOTICE))
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::RecordingClient;
    use crate::room::GlobalConfig;

    const SELF: &str = "@figma:example.com";

    async fn gatekeeper_with_admins(
        client: Arc<RecordingClient>,
        admins: &[&str],
    ) -> InviteGatekeeper {
        let config = SharedGlobalConfig::default();
        *config.write().await = Some(GlobalConfig {
            admin_users: admins.iter().map(|user| user.to_string()).collect(),
        });
        InviteGatekeeper::new(client, config, SELF)
    }

    #[tokio::test]
    async fn invite_before_config_loaded_is_ignored() {
        let client = Arc::new(RecordingClient::new());
        let gatekeeper =
            InviteGatekeeper::new(client.clone(), SharedGlobalConfig::default(), SELF);

        gatekeeper.on_invite("!room:example.com", "@admin:example.com").await.unwrap();

        assert!(client.joins.lock().is_empty());
        assert!(client.kicks.lock().is_empty());
    }

    #[tokio::test]
    async fn non_admin_invite_leaves_without_notice() {
        let client = Arc::new(RecordingClient::new());
        let gatekeeper =
            gatekeeper_with_admins(client.clone(), &["@admin:example.com"]).await;

        gatekeeper.on_invite("!room:example.com", "@stranger:example.com").await.unwrap();

        assert!(client.joins.lock().is_empty());
        assert_eq!(client.sent_count(), 0);
        let kicks = client.kicks.lock();
        assert_eq!(kicks.len(), 1);
        assert_eq!(kicks[0].1, SELF);
        assert_eq!(kicks[0].2, KICK_REASON);
    }

    #[tokio::test]
    async fn admin_invite_joins_and_onboards_once() {
        let client = Arc::new(RecordingClient::new());
        let gatekeeper =
            gatekeeper_with_admins(client.clone(), &["@admin:example.com"]).await;

        gatekeeper.on_invite("!room:example.com", "@admin:example.com").await.unwrap();
        gatekeeper.on_invite("!room:example.com", "@admin:example.com").await.unwrap();

        assert_eq!(client.joins.lock().len(), 2);
        let bodies = client.bodies_for("!room:example.com");
        assert_eq!(bodies.len(), 1);
        assert!(bodies[0].contains("figma track"));
        assert!(client.kicks.lock().is_empty());
    }
}
