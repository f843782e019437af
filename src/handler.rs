//! Serenity glue: turns gateway events into `Inbound` events for the router and renders the
//! replies. Also provides the DM-based `Notifier`.

use crate::database::models::AccountId;
use crate::error::{BotError, BotResult};
use crate::interactions::ids;
use crate::router::{self, Inbound, InboundKind};
use crate::services::notify::{Notice, Notifier};
use crate::ui::render;
use crate::AppState;
use crate::database::models::ModerationStatus;
use serenity::async_trait;
use serenity::builder::{CreateInteractionResponse, EditMessage};
use serenity::client::Context;
use serenity::http::Http;
use serenity::model::application::Interaction;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, UserId};
use serenity::prelude::EventHandler;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Handler;

async fn app_state(ctx: &Context) -> Option<Arc<AppState>> {
    let state = ctx.data.read().await.get::<AppState>().cloned();
    if state.is_none() {
        warn!(target = "discord", "AppState missing from TypeMap");
    }
    state
}

/// Attachments win over text unless the text is a command.
fn inbound_kind(msg: &Message, prefix: &str) -> Option<InboundKind> {
    let text = msg.content.trim();
    if text.starts_with(prefix) {
        return Some(InboundKind::Text(text.to_string()));
    }
    if let Some(att) = msg.attachments.first() {
        let content_type = att.content_type.as_deref().unwrap_or_default();
        let url = att.url.clone();
        return Some(if content_type.starts_with("image/") {
            InboundKind::Photo(url)
        } else if content_type.starts_with("video/") {
            InboundKind::Video(url)
        } else {
            InboundKind::File(url)
        });
    }
    (!text.is_empty()).then(|| InboundKind::Text(text.to_string()))
}

async fn send_all(ctx: &Context, channel: ChannelId, replies: Vec<Notice>) {
    for notice in replies {
        if let Err(e) = channel
            .send_message(&ctx.http, render::message(&notice))
            .await
        {
            warn!(target = "discord", channel = %channel, error = %e, "Failed to send reply");
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Component(mut component) = interaction else {
            return;
        };
        let Some(app) = app_state(&ctx).await else {
            return;
        };
        let token = component.data.custom_id.clone();
        let account = AccountId::from(component.user.id);
        if let Err(e) = component
            .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
            .await
        {
            warn!(target = "discord", error = %e, "Failed to acknowledge interaction");
        }

        let replies = router::route(&app, Inbound::button(account, token.clone())).await;

        // Once a request is settled its decision buttons are removed from the admin's copy.
        if ids::is_moderation(&token) && app.is_admin(account) {
            if let Some(ticket) = ids::parse_moderation_token(&token) {
                let settled = matches!(
                    app.store.request(ticket.request_id).await,
                    Ok(Some(r)) if r.status != ModerationStatus::Pending
                );
                if settled {
                    let edit = EditMessage::new().components(Vec::new());
                    if let Err(e) = component.message.edit(&ctx.http, edit).await {
                        warn!(target = "discord", error = %e, "Failed to strip moderation controls");
                    }
                }
            }
        }
        send_all(&ctx, component.channel_id, replies).await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(app) = app_state(&ctx).await else {
            return;
        };
        let Some(kind) = inbound_kind(&msg, &app.prefix) else {
            return;
        };
        // In guild channels only commands are handled; conversations happen in DMs.
        let is_command = matches!(&kind, InboundKind::Text(t) if t.starts_with(app.prefix.as_str()));
        if msg.guild_id.is_some() && !is_command {
            return;
        }
        let inbound = Inbound {
            account: AccountId::from(msg.author.id),
            kind,
        };
        let replies = router::route(&app, inbound).await;
        send_all(&ctx, msg.channel_id, replies).await;
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(target = "discord", user = %ready.user.name, "Connected and ready");
    }
}

/// Delivers notices as direct messages.
pub struct DiscordNotifier {
    http: Arc<Http>,
}

impl DiscordNotifier {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn deliver(&self, to: AccountId, notice: Notice) -> BotResult<()> {
        if to.get() == 0 {
            return Err(BotError::NotificationDelivery("invalid user id 0".into()));
        }
        let channel = UserId::new(to.get())
            .create_dm_channel(&self.http)
            .await
            .map_err(|e| BotError::NotificationDelivery(e.to_string()))?;
        channel
            .send_message(&self.http, render::message(&notice))
            .await
            .map_err(|e| BotError::NotificationDelivery(e.to_string()))?;
        Ok(())
    }
}
