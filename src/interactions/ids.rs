//! Centralized custom_id string constants for interaction components.
//! Every control the bot renders carries one of these tokens; the router parses them back.

use crate::database::models::{AccountId, Decision, ModerationKind, ModerationRequest};
use rust_decimal::Decimal;
use std::str::FromStr;

pub const CANCEL: &str = "cancel";
pub const CLICK: &str = "click";

// Main menu
pub const MENU_HOME: &str = "menu_home";
pub const MENU_CURRENCY: &str = "menu_uc";
pub const MENU_POPULARITY: &str = "menu_pop";
pub const MENU_GOODS: &str = "menu_goods";
pub const MENU_CABINET: &str = "menu_cabinet";
pub const MENU_TOPUP: &str = "menu_topup";
pub const MENU_TRANSFER: &str = "menu_transfer";
pub const MENU_UPGRADE: &str = "menu_upgrade";
pub const MENU_CLICKER: &str = "menu_click";

// Catalog
pub const BUY_PACKAGE_PREFIX: &str = "buy_"; // followed by package id
pub const BUY_GOOD_PREFIX: &str = "buygood_"; // followed by good id

// Admin
pub const DELETE_GOOD_PREFIX: &str = "delgood_"; // followed by good id
pub const MODERATION_PREFIX: &str = "mod_";
pub const MODERATION_APPROVE_PREFIX: &str = "mod_approve_";
pub const MODERATION_DECLINE_PREFIX: &str = "mod_decline_";

pub fn is_moderation(id: &str) -> bool {
    id.starts_with(MODERATION_PREFIX)
}

/// Parse `<prefix><positive id>`.
pub fn parse_prefixed_id(id: &str, prefix: &str) -> Option<i64> {
    id.strip_prefix(prefix)?
        .parse::<i64>()
        .ok()
        .filter(|v| *v > 0)
}

/// Everything a moderation control encodes. The router checks it against the stored request
/// before acting, so a forged or stale token cannot resolve a different request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationTicket {
    pub decision: Decision,
    pub request_id: i64,
    pub kind: ModerationKind,
    pub requester: AccountId,
    pub amount: Decimal,
}

impl ModerationTicket {
    pub fn matches(&self, request: &ModerationRequest) -> bool {
        self.request_id == request.id
            && self.kind == request.kind
            && self.requester == request.requester
            && self.amount == request.amount
    }
}

/// `mod_<approve|decline>_<request id>_<kind>_<requester>_<amount>`
pub fn moderation_token(decision: Decision, request: &ModerationRequest) -> String {
    let prefix = match decision {
        Decision::Approve => MODERATION_APPROVE_PREFIX,
        Decision::Decline => MODERATION_DECLINE_PREFIX,
    };
    format!(
        "{prefix}{}_{}_{}_{}",
        request.id,
        request.kind.code(),
        request.requester,
        request.amount.normalize()
    )
}

pub fn parse_moderation_token(id: &str) -> Option<ModerationTicket> {
    let (decision, rest) = if let Some(rest) = id.strip_prefix(MODERATION_APPROVE_PREFIX) {
        (Decision::Approve, rest)
    } else if let Some(rest) = id.strip_prefix(MODERATION_DECLINE_PREFIX) {
        (Decision::Decline, rest)
    } else {
        return None;
    };
    // Split from the right: the amount and requester are the last two fields.
    let (rest, amount) = rest.rsplit_once('_')?;
    let (rest, requester) = rest.rsplit_once('_')?;
    let (request_id, kind) = rest.split_once('_')?;

    let request_id = request_id.parse::<i64>().ok().filter(|v| *v > 0)?;
    let kind = ModerationKind::from_code(kind)?;
    let requester = AccountId::from_str(requester).ok()?;
    let amount = Decimal::from_str(amount).ok().filter(|a| *a >= Decimal::ZERO)?;
    Some(ModerationTicket {
        decision,
        request_id,
        kind,
        requester,
        amount,
    })
}
