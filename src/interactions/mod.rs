//! This module acts as a central router for all component interactions.
//!
//! Every control carries a token from `ids`. Fixed tokens map straight to a command; prefixed
//! tokens carry an id (or, for moderation, the whole request summary) after the prefix.

pub mod ids;

use crate::AppState;
use crate::commands::{admin, cabinet, clicker, menu, shop};
use crate::conversation::{FlowKind, Scratch};
use crate::database::models::{AccountId, PackageKind};
use crate::error::{BotError, BotResult};
use crate::services::notify::Notice;

pub async fn route_button(app: &AppState, account: AccountId, token: &str) -> BotResult<Vec<Notice>> {
    match token {
        ids::MENU_HOME => menu::run(app, account).await,
        ids::MENU_CURRENCY => shop::packages(app, account, PackageKind::Currency).await,
        ids::MENU_POPULARITY => shop::packages(app, account, PackageKind::Popularity).await,
        ids::MENU_GOODS => shop::goods(app, account).await,
        ids::MENU_CABINET => cabinet::run(app, account).await,
        ids::MENU_TOPUP => start_flow(app, account, FlowKind::TopUp).await,
        ids::MENU_TRANSFER => start_flow(app, account, FlowKind::Transfer).await,
        ids::MENU_UPGRADE => start_flow(app, account, FlowKind::Upgrade).await,
        ids::MENU_CLICKER | ids::CLICK => clicker::click(app, account).await,
        t if ids::is_moderation(t) => admin::resolve(app, account, t).await,
        t => {
            if let Some(id) = ids::parse_prefixed_id(t, ids::BUY_PACKAGE_PREFIX) {
                shop::buy_package(app, account, id).await
            } else if let Some(id) = ids::parse_prefixed_id(t, ids::BUY_GOOD_PREFIX) {
                shop::buy_good(app, account, id).await
            } else if let Some(id) = ids::parse_prefixed_id(t, ids::DELETE_GOOD_PREFIX) {
                admin::delete_good(app, account, Some(id)).await
            } else {
                Err(BotError::MalformedToken(t.to_string()))
            }
        }
    }
}

pub async fn start_flow(app: &AppState, account: AccountId, kind: FlowKind) -> BotResult<Vec<Notice>> {
    Ok(vec![app.engine.start(account, kind, Scratch::new()).await?])
}
