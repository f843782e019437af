//! Clicker: each click credits the tier's click reward once the clicker is unlocked.

use crate::AppState;
use crate::database::models::AccountId;
use crate::error::{BotError, BotResult};
use crate::interactions::ids;
use crate::services::notify::{Control, ControlStyle, Notice};
use tracing::debug;

pub fn click_control() -> Control {
    Control::new(ids::CLICK, "🖱 Click", ControlStyle::Primary)
}

pub async fn click(app: &AppState, account: AccountId) -> BotResult<Vec<Notice>> {
    let acct = app
        .store
        .account(account)
        .await?
        .ok_or_else(|| BotError::not_found(format!("Account {account}")))?;
    if !acct.clicker_unlocked {
        return Err(BotError::invalid(format!(
            "🔒 The clicker is locked. Unlock it with `{}upgrade`.",
            app.prefix
        )));
    }
    let reward = app.pricing.for_tier(acct.tier).await?.click_reward;
    let balance = app.store.credit(account, reward, "Click").await?;
    debug!(target = "ledger", account = %account, reward = %reward, "Click credited");
    let theme = app.theme().await?;
    Ok(vec![
        Notice::text(format!(
            "🖱 +{} | Balance: {}",
            theme.money(reward),
            theme.money(balance)
        ))
        .control(click_control()),
    ])
}
