use std::sync::Arc;

use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use storefront_bot::AppState;
use storefront_bot::config::Settings;
use storefront_bot::conversation::spawn_idle_sweeper;
use storefront_bot::database::{MemoryStore, PgStore, Store, seed_catalog};
use storefront_bot::error::{BotError, BotResult};
use storefront_bot::handler::{DiscordNotifier, Handler};
use storefront_bot::services::notify::Notifier;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "Fatal error");
        std::process::exit(1);
    }
}

async fn run() -> BotResult<()> {
    let settings = Settings::from_env()?;

    let store: Arc<dyn Store> = match &settings.database_url {
        Some(url) => {
            let store = PgStore::connect(url, settings.db_max_connections).await?;
            info!(target = "startup", "Connected to Postgres and applied migrations");
            Arc::new(store)
        }
        None => {
            warn!(target = "startup", "DATABASE_URL not set; state lives in memory and is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    seed_catalog(store.as_ref()).await?;

    // DMs carry the conversations; guild messages only matter for prefixed commands.
    let intents = GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&settings.discord_token, intents)
        .event_handler(Handler)
        .await
        .map_err(|e| BotError::Config(format!("failed to create the Discord client: {e}")))?;

    let notifier: Arc<dyn Notifier> = Arc::new(DiscordNotifier::new(client.http.clone()));
    let app = Arc::new(AppState::new(
        store,
        notifier,
        settings.admin_id,
        settings.command_prefix.clone(),
        settings.session_idle,
    ));
    {
        let mut data = client.data.write().await;
        data.insert::<AppState>(app.clone());
    }
    spawn_idle_sweeper(app.engine.clone(), settings.sweep_interval);

    info!(target = "startup", admin = %settings.admin_id, prefix = %settings.command_prefix, "Starting client");
    client
        .start()
        .await
        .map_err(|e| BotError::Config(format!("client error: {e}")))
}
