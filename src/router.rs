//! Transport-neutral event routing.
//!
//! Order of precedence for one inbound event:
//! 1. cancel (button or bare word) always clears the active flow;
//! 2. prefixed text is a command, even mid-flow (starting a new flow replaces the old one);
//! 3. buttons go to `interactions::route_button`;
//! 4. anything else is input for the active flow, or falls back to the main menu.

use crate::AppState;
use crate::commands::{Command, admin, cabinet, clicker, help, id_arg, menu, shop, start};
use crate::conversation::{FlowKind, Input, Outcome};
use crate::database::models::{AccountId, PackageKind};
use crate::error::BotResult;
use crate::interactions::{self, ids, start_flow};
use crate::services::notify::Notice;
use crate::services::theme::Theme;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    Text(String),
    Photo(String),
    Video(String),
    File(String),
    /// A pressed control, carrying its token.
    Button(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub account: AccountId,
    pub kind: InboundKind,
}

impl Inbound {
    pub fn text(account: AccountId, text: impl Into<String>) -> Self {
        Self {
            account,
            kind: InboundKind::Text(text.into()),
        }
    }

    pub fn button(account: AccountId, token: impl Into<String>) -> Self {
        Self {
            account,
            kind: InboundKind::Button(token.into()),
        }
    }
}

/// Handle one event and return the replies for the sender. Errors are rendered here; nothing
/// below this point talks to the transport.
pub async fn route(app: &AppState, inbound: Inbound) -> Vec<Notice> {
    let account = inbound.account;
    match dispatch(app, inbound).await {
        Ok(replies) => replies,
        Err(e) => {
            if e.is_recoverable() {
                debug!(target = "router", account = %account, error = %e, "Request rejected");
            } else {
                error!(target = "router", account = %account, error = %e, "Request failed");
            }
            let currency = match app.theme().await {
                Ok(theme) => theme.currency,
                Err(_) => Theme::default().currency,
            };
            vec![Notice::text(e.user_message(&currency))]
        }
    }
}

fn is_cancel(kind: &InboundKind) -> bool {
    match kind {
        InboundKind::Button(token) => token == ids::CANCEL,
        InboundKind::Text(text) => {
            let t = text.trim().trim_start_matches('❌').trim();
            t.eq_ignore_ascii_case("cancel")
        }
        _ => false,
    }
}

async fn ensure_account(app: &AppState, account: AccountId) -> BotResult<()> {
    if app.store.account(account).await?.is_none() {
        app.store.register(account, None, Decimal::ZERO).await?;
    }
    Ok(())
}

async fn dispatch(app: &AppState, inbound: Inbound) -> BotResult<Vec<Notice>> {
    let account = inbound.account;
    if is_cancel(&inbound.kind) {
        return Ok(app.engine.cancel(account).await.into_notice().into_iter().collect());
    }
    if let InboundKind::Text(text) = &inbound.kind {
        if let Some(body) = text.trim().strip_prefix(app.prefix.as_str()) {
            return run_command(app, account, body).await;
        }
    }
    ensure_account(app, account).await?;
    let input = match inbound.kind {
        InboundKind::Button(token) => {
            return interactions::route_button(app, account, &token).await;
        }
        InboundKind::Text(t) => Input::Text(t),
        InboundKind::Photo(r) => Input::Photo(r),
        InboundKind::Video(r) => Input::Video(r),
        InboundKind::File(r) => Input::File(r),
    };
    match app.engine.submit(account, input).await? {
        Outcome::NoFlow => menu::run(app, account).await,
        outcome => Ok(outcome.into_notice().into_iter().collect()),
    }
}

async fn run_command(app: &AppState, account: AccountId, body: &str) -> BotResult<Vec<Notice>> {
    let mut parts = body.split_whitespace();
    let Some(name) = parts.next() else {
        return Ok(Vec::new());
    };
    let command = Command::from_str(&name.to_lowercase()).unwrap_or(Command::Unknown);
    let args: Vec<&str> = parts.collect();
    // `start` registers on its own so that the invite code is honoured on first contact.
    if command != Command::Start {
        ensure_account(app, account).await?;
    }
    match command {
        Command::Start => start::run(app, account, &args).await,
        Command::Menu => menu::run(app, account).await,
        Command::Help => Ok(help::run(app, account)),
        Command::Cabinet => cabinet::run(app, account).await,
        Command::Currency => shop::packages(app, account, PackageKind::Currency).await,
        Command::Popularity => shop::packages(app, account, PackageKind::Popularity).await,
        Command::Goods => shop::goods(app, account).await,
        Command::Buy => match id_arg(&args) {
            Some(id) => shop::buy_package(app, account, id).await,
            None => Ok(vec![usage(app, "buy <package id>")]),
        },
        Command::BuyGood => match id_arg(&args) {
            Some(id) => shop::buy_good(app, account, id).await,
            None => Ok(vec![usage(app, "buygood <item id>")]),
        },
        Command::TopUp => start_flow(app, account, FlowKind::TopUp).await,
        Command::Transfer => start_flow(app, account, FlowKind::Transfer).await,
        Command::Upgrade => start_flow(app, account, FlowKind::Upgrade).await,
        Command::Click => clicker::click(app, account).await,
        Command::Cancel => Ok(app.engine.cancel(account).await.into_notice().into_iter().collect()),
        Command::Admin => admin::panel(app, account).await,
        Command::AddGood => start_flow(app, account, FlowKind::AddGood).await,
        Command::AddPackage => start_flow(app, account, FlowKind::AddPackage).await,
        Command::EditPrice => start_flow(app, account, FlowKind::EditPackage).await,
        Command::SetRate => start_flow(app, account, FlowKind::SetRate).await,
        Command::Rates => admin::rates(app, account).await,
        Command::DelGood => admin::delete_good(app, account, id_arg(&args)).await,
        Command::DelPackage => admin::delete_package(app, account, id_arg(&args)).await,
        Command::Pending => admin::pending(app, account).await,
        Command::Unknown => Ok(vec![Notice::text(format!(
            "❓ Unknown command. Type `{}help` for the list.",
            app.prefix
        ))]),
    }
}

fn usage(app: &AppState, usage: &str) -> Notice {
    Notice::text(format!("Usage: `{}{usage}`", app.prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_matches_button_and_bare_word() {
        assert!(is_cancel(&InboundKind::Button(ids::CANCEL.into())));
        assert!(is_cancel(&InboundKind::Text(" ❌ Cancel ".into())));
        assert!(!is_cancel(&InboundKind::Text("cancelled".into())));
        assert!(!is_cancel(&InboundKind::Photo("cancel".into())));
    }

    #[test]
    fn unknown_command_names_fall_back() {
        assert_eq!(Command::from_str("nope"), Ok(Command::Unknown));
        assert_eq!(id_arg(&["#12"]), Some(12));
        assert_eq!(id_arg(&["-3"]), None);
    }
}
