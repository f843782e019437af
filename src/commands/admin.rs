//! Admin-only commands. Every entry point checks the caller against the configured admin id.

use crate::AppState;
use crate::database::models::{AccountId, ModerationStatus};
use crate::error::{BotError, BotResult};
use crate::services::moderation::admin_notice;
use crate::services::notify::Notice;
use crate::services::theme::ThemeKey;
use tracing::info;

pub fn require_admin(app: &AppState, account: AccountId) -> BotResult<()> {
    if app.is_admin(account) {
        Ok(())
    } else {
        Err(BotError::Forbidden)
    }
}

pub async fn panel(app: &AppState, account: AccountId) -> BotResult<Vec<Notice>> {
    require_admin(app, account)?;
    let p = &app.prefix;
    let pending = app.store.pending_requests().await?.len();
    Ok(vec![Notice::text(format!(
        "🛠 **Admin panel**\nPending requests: {pending}\n\n\
         `{p}pending` review pending requests\n\
         `{p}addgood` add a digital good\n\
         `{p}addpackage` add a currency package\n\
         `{p}editprice` change a package price\n\
         `{p}delgood <id>` remove a digital good\n\
         `{p}delpackage <id>` remove a package\n\
         `{p}rates` show rates and display settings\n\
         `{p}setrate` change a rate or display setting"
    ))])
}

pub async fn rates(app: &AppState, account: AccountId) -> BotResult<Vec<Notice>> {
    require_admin(app, account)?;
    let mut lines = vec!["⚙️ **Rates**".to_string()];
    for (rate, value) in app.pricing.snapshot().await? {
        lines.push(format!("`{}` = {}", rate.key(), value));
    }
    lines.push(String::new());
    lines.push("🎨 **Display**".to_string());
    for key in ThemeKey::ALL {
        let value = app.store.get_or_init(key.key(), key.default_value()).await?;
        lines.push(format!("`{}` = {value}", key.key()));
    }
    Ok(vec![Notice::text(lines.join("\n"))])
}

pub async fn pending(app: &AppState, account: AccountId) -> BotResult<Vec<Notice>> {
    require_admin(app, account)?;
    let theme = app.theme().await?;
    let requests = app.store.pending_requests().await?;
    if requests.is_empty() {
        return Ok(vec![Notice::text("✅ No pending requests.")]);
    }
    Ok(requests.iter().map(|r| admin_notice(r, &theme)).collect())
}

pub async fn delete_good(app: &AppState, account: AccountId, id: Option<i64>) -> BotResult<Vec<Notice>> {
    require_admin(app, account)?;
    let id = id.ok_or_else(|| BotError::invalid(format!("Usage: `{}delgood <id>`", app.prefix)))?;
    app.store.delete_good(id).await?;
    info!(target = "catalog", good = id, "Digital good deleted");
    Ok(vec![Notice::text(format!("🗑 Item #{id} deleted."))])
}

pub async fn delete_package(
    app: &AppState,
    account: AccountId,
    id: Option<i64>,
) -> BotResult<Vec<Notice>> {
    require_admin(app, account)?;
    let id =
        id.ok_or_else(|| BotError::invalid(format!("Usage: `{}delpackage <id>`", app.prefix)))?;
    app.store.delete_package(id).await?;
    info!(target = "catalog", package = id, "Package deleted");
    Ok(vec![Notice::text(format!("🗑 Package #{id} deleted."))])
}

/// Handle an approve/decline control. A repeat press on a resolved request is acknowledged
/// without any effect.
pub async fn resolve(app: &AppState, account: AccountId, token: &str) -> BotResult<Vec<Notice>> {
    let theme = app.theme().await?;
    match app.moderation.resolve(account, token, &theme).await {
        Ok(request) => {
            let verdict = match request.status {
                ModerationStatus::Approved => "✅ approved",
                ModerationStatus::Declined => "❌ declined",
                ModerationStatus::Pending => "⏳ pending",
            };
            Ok(vec![Notice::text(format!(
                "Request #{} from {} {verdict}.",
                request.id, request.requester
            ))])
        }
        Err(e @ BotError::AlreadyResolved(_)) => {
            Ok(vec![Notice::text(e.user_message(&theme.currency))])
        }
        Err(e) => Err(e),
    }
}
