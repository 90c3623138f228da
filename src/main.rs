//! Bridge entry point.

use anyhow::Context as _;
use clap::Parser;
use futures::StreamExt as _;
use tracing_subscriber::EnvFilter;

use matrix_figma::chat::{ChatClientDyn, ChatEvent, MatrixClient};
use matrix_figma::invites::InviteGatekeeper;
use matrix_figma::router::{Router, SharedGlobalConfig};
use matrix_figma::{bootstrap, config, server};

use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "matrix-figma")]
#[command(about = "Relays Figma comment webhooks into Matrix rooms")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = config::Config::load().with_context(|| "failed to load configuration")?;

    let client: Arc<dyn ChatClientDyn> = Arc::new(MatrixClient::new(&config.matrix));
    let self_user_id = client
        .whoami()
        .await
        .with_context(|| "failed to resolve own user id")?;
    tracing::info!(user_id = %self_user_id, "authenticated against homeserver");

    let global_config = SharedGlobalConfig::default();
    let router = Arc::new(Router::new(
        client.clone(),
        self_user_id.clone(),
        config.admin_room.clone(),
        global_config.clone(),
    ));
    let gatekeeper = InviteGatekeeper::new(client.clone(), global_config.clone(), self_user_id);

    tracing::info!("syncing rooms...");
    bootstrap::sync_rooms(&client, &router).await;
    tracing::info!(rooms = router.room_count().await, "room sync complete");

    bootstrap::load_global_config(&client, &config.admin_room, &global_config).await;

    let bind: SocketAddr = ([0, 0, 0, 0], config.webhook_port).into();
    let _server = server::start_webhook_server(bind, router.clone(), config.webhook_passcode)
        .await
        .with_context(|| "failed to start webhook listener")?;

    tracing::info!("starting sync stream...");
    let mut events = client
        .start()
        .await
        .with_context(|| "failed to start chat event stream")?;

    let event_loop = async {
        while let Some(event) = events.next().await {
            match event {
                ChatEvent::Message { room_id, event } => {
                    if let Err(error) = router.on_room_message(&room_id, &event).await {
                        tracing::error!(%error, room_id, "failed to handle room message");
                    }
                }
                ChatEvent::State { room_id, event } => {
                    if let Err(error) = router.on_room_state_event(&room_id, &event).await {
                        tracing::error!(%error, room_id, "failed to handle state event");
                    }
                }
                ChatEvent::Invite { room_id, sender } => {
                    if let Err(error) = gatekeeper.on_invite(&room_id, &sender).await {
                        tracing::error!(%error, room_id, "failed to handle invite");
                    }
                }
            }
        }
    };

    tokio::select! {
        _ = event_loop => {
            tracing::warn!("chat event stream ended");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
