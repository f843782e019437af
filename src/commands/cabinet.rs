//! `cabinet`: balance, status, clicker state and the latest ledger entries.

use crate::AppState;
use crate::constants::HISTORY_LIMIT;
use crate::database::models::AccountId;
use crate::error::{BotError, BotResult};
use crate::interactions::ids;
use crate::services::notify::{Control, ControlStyle, Notice};
use crate::services::theme::Theme;
use rust_decimal::Decimal;

pub async fn run(app: &AppState, account: AccountId) -> BotResult<Vec<Notice>> {
    let acct = app
        .store
        .account(account)
        .await?
        .ok_or_else(|| BotError::not_found(format!("Account {account}")))?;
    let policy = app.pricing.for_tier(acct.tier).await?;
    let history = app.store.history(account, HISTORY_LIMIT).await?;
    let theme = app.theme().await?;

    let status = match acct.tier_expires_at {
        Some(at) => format!("{} (until {})", Theme::tier_name(acct.tier), at.format("%Y-%m-%d")),
        None => Theme::tier_name(acct.tier).to_string(),
    };
    let mut lines = vec![
        "👤 **Cabinet**".to_string(),
        format!("ID: `{}`", acct.id),
        format!("Balance: **{}**", theme.money(acct.balance)),
        format!("Status: {status}"),
        format!("Discount: {}%", (policy.discount * Decimal::ONE_HUNDRED).normalize()),
        format!("Transfer limit: {}", theme.money(policy.transfer_limit)),
        format!(
            "Clicker: {}",
            if acct.clicker_unlocked { "unlocked" } else { "locked" }
        ),
        format!(
            "Invite friends with `{}start {}` and earn {} each.",
            app.prefix,
            acct.id,
            theme.money(policy.referral_reward)
        ),
        String::new(),
        "📜 Recent activity:".to_string(),
    ];
    if history.is_empty() {
        lines.push("No transactions yet.".to_string());
    }
    for e in &history {
        let sign = if e.amount >= Decimal::ZERO { "+" } else { "" };
        lines.push(format!(
            "`{}` {sign}{} | {}",
            e.created_at.format("%m-%d %H:%M"),
            theme.money(e.amount),
            e.reason
        ));
    }
    Ok(vec![Notice::text(lines.join("\n")).controls([
        Control::new(ids::MENU_TOPUP, "💳 Top up", ControlStyle::Success),
        Control::new(ids::MENU_HOME, "🏠 Menu", ControlStyle::Secondary),
    ])])
}
