//! `start [referrer]`: registration and the referral reward.

use crate::AppState;
use crate::commands::menu::main_menu;
use crate::database::models::AccountId;
use crate::error::BotResult;
use crate::services::notify::{Notice, notify_best_effort};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::info;

pub async fn run(app: &AppState, account: AccountId, args: &[&str]) -> BotResult<Vec<Notice>> {
    let referrer = args
        .first()
        .and_then(|a| AccountId::from_str(a).ok())
        .filter(|r| *r != account);
    // The reward follows the referrer's tier at the time of the referral.
    let reward = match referrer {
        Some(r) => match app.store.account(r).await? {
            Some(acc) => app.pricing.for_tier(acc.tier).await?.referral_reward,
            None => Decimal::ZERO,
        },
        None => Decimal::ZERO,
    };
    let registration = app.store.register(account, referrer, reward).await?;
    let theme = app.theme().await?;

    if registration.created {
        info!(target = "accounts", account = %account, referrer = ?referrer, "Account registered");
    }
    if let Some((referrer, amount)) = registration.referral_paid {
        info!(target = "accounts", referrer = %referrer, reward = %amount, "Referral reward paid");
        notify_best_effort(
            app.notifier.as_ref(),
            referrer,
            Notice::text(format!(
                "🎉 A new user joined with your invite! You received {}.",
                theme.money(amount)
            )),
            "referral",
        )
        .await;
    }

    let header = if registration.created {
        "👋 Welcome to the shop!"
    } else {
        "👋 Welcome back!"
    };
    let admin = app.is_admin(account).then_some(app.prefix.as_str());
    Ok(vec![main_menu(&theme, header, admin)])
}
