use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use markoslav_core::{FontRenderer, ModerationQueue, SqliteRepository};
use markoslav_server::config::Config;
use markoslav_server::conversation::ConversationStore;
use markoslav_server::poller::{drain_backlog, poll_loop};
use markoslav_server::router::Services;
use markoslav_server::scheduler::ConversationScheduler;
use markoslav_server::status::{status_router, StatusState};
use markoslav_server::telegram::TelegramClient;
use markoslav_server::workflow::{build_router, WorkflowSettings};

#[tokio::main]
async fn main() -> Result<()> {
    let config =
        Config::from_env().context("Failed to load configuration from environment variables")?;

    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("Starting markoslav caption bot");
    info!("{} administrators configured", config.admins.len());

    let db_path = config.db_path();
    info!("Using caption database: {}", db_path.display());
    let repository = SqliteRepository::new(&db_path).context("Failed to initialize SQLite database")?;

    let renderer = FontRenderer::from_file(&config.font_path)
        .with_context(|| format!("Failed to load font from {}", config.font_path.display()))?;

    let client = TelegramClient::new(&config.api_base_url, &config.bot_token)
        .context("Failed to build HTTP client")?;
    let username = client
        .get_me()
        .await
        .context("Failed to authenticate with the Bot API")?;
    info!("Authorized as @{}", username);

    let store = Arc::new(ConversationStore::new());
    let queue = ModerationQueue::new(Arc::new(repository));
    let services = Services {
        queue: queue.clone(),
        transport: Arc::new(client.clone()),
        renderer: Arc::new(renderer),
    };
    let router = build_router(
        store.clone(),
        services,
        WorkflowSettings {
            admins: config.admins.clone(),
            page_size: config.page_size,
            random_reply_percent: config.random_reply_percent,
        },
    );
    info!("Registered handlers: {}", router.handler_names().join(", "));
    let scheduler = Arc::new(ConversationScheduler::new(Arc::new(router)));

    let app = status_router(Arc::new(StatusState { store, queue }));
    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Status server listening on port {}", config.port);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Status server failed: {}", e);
        }
    });

    let offset = drain_backlog(&client)
        .await
        .context("Failed to skip stale updates")?;

    info!("Polling for updates");
    tokio::select! {
        _ = poll_loop(client, scheduler.clone(), offset) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Shutting down");
        }
    }

    scheduler.shutdown().await;
    Ok(())
}
