//! Admin moderation protocol: raise a request, show it to the admin with approve/decline
//! controls, resolve it exactly once and tell the requester.

use crate::database::Store;
use crate::database::models::{
    AccountId, Decision, ModerationKind, ModerationRequest, NewModeration, ReservationPolicy,
};
use crate::error::{BotError, BotResult};
use crate::interactions::ids::{moderation_token, parse_moderation_token};
use crate::services::notify::{
    Attachment, Control, ControlStyle, Notice, Notifier, notify_best_effort,
};
use crate::services::theme::Theme;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct Moderation {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    admin: AccountId,
}

impl Moderation {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, admin: AccountId) -> Self {
        Self {
            store,
            notifier,
            admin,
        }
    }

    pub fn admin(&self) -> AccountId {
        self.admin
    }

    /// Persist the request (reserving funds for debit-on-raise kinds) and forward it to the
    /// admin. The request stands even if the admin cannot be reached.
    #[instrument(level = "debug", skip(self, new, evidence, theme), fields(requester = %new.requester, kind = new.kind.code()))]
    pub async fn raise(
        &self,
        new: NewModeration,
        reserve_reason: &str,
        evidence: Option<Attachment>,
        theme: &Theme,
    ) -> BotResult<ModerationRequest> {
        let reserve = match new.kind.reservation() {
            ReservationPolicy::DebitOnRaise => Some(reserve_reason),
            ReservationPolicy::CreditOnAccept => None,
        };
        let request = self.store.open_request(new, reserve).await?;
        info!(
            target = "moderation",
            request = request.id,
            requester = %request.requester,
            kind = request.kind.code(),
            amount = %request.amount,
            "Moderation request raised"
        );
        notify_best_effort(
            self.notifier.as_ref(),
            self.admin,
            admin_notice(&request, theme).attach(evidence),
            "moderation_request",
        )
        .await;
        Ok(request)
    }

    /// Resolve the request a control token points at. Only the admin may do this; the token
    /// must agree with the stored request; a second resolution is `AlreadyResolved`.
    #[instrument(level = "debug", skip(self, theme))]
    pub async fn resolve(
        &self,
        actor: AccountId,
        token: &str,
        theme: &Theme,
    ) -> BotResult<ModerationRequest> {
        if actor != self.admin {
            return Err(BotError::Forbidden);
        }
        let ticket = parse_moderation_token(token)
            .ok_or_else(|| BotError::MalformedToken(token.to_string()))?;
        let stored = self
            .store
            .request(ticket.request_id)
            .await?
            .ok_or_else(|| BotError::not_found(format!("Request #{}", ticket.request_id)))?;
        if !ticket.matches(&stored) {
            return Err(BotError::MalformedToken(token.to_string()));
        }
        let resolved = self
            .store
            .resolve_request(ticket.request_id, ticket.decision)
            .await?;
        info!(
            target = "moderation",
            request = resolved.id,
            status = resolved.status.as_str(),
            "Moderation request resolved"
        );
        notify_best_effort(
            self.notifier.as_ref(),
            resolved.requester,
            requester_notice(&resolved, ticket.decision, theme),
            "moderation_result",
        )
        .await;
        Ok(resolved)
    }
}

/// Request summary with both decision controls, as shown to the admin.
pub fn admin_notice(request: &ModerationRequest, theme: &Theme) -> Notice {
    let title = match request.kind {
        ModerationKind::PurchaseConfirmation => "🛒 New order",
        ModerationKind::TopUpConfirmation => "💳 Top-up request",
    };
    Notice::text(format!(
        "{title} #{}\nFrom: {}\nAmount: {}\n{}",
        request.id,
        request.requester,
        theme.money(request.amount),
        request.context
    ))
    .controls([
        Control::new(
            moderation_token(Decision::Approve, request),
            "✅ Approve",
            ControlStyle::Success,
        ),
        Control::new(
            moderation_token(Decision::Decline, request),
            "❌ Decline",
            ControlStyle::Danger,
        ),
    ])
}

pub fn requester_notice(request: &ModerationRequest, decision: Decision, theme: &Theme) -> Notice {
    let amount = theme.money(request.amount);
    let text = match (request.kind, decision) {
        (ModerationKind::PurchaseConfirmation, Decision::Approve) => {
            format!("✅ Your order #{} has been completed.", request.id)
        }
        (ModerationKind::PurchaseConfirmation, Decision::Decline) => format!(
            "❌ Your order #{} was declined. {amount} has been returned to your balance.",
            request.id
        ),
        (ModerationKind::TopUpConfirmation, Decision::Approve) => format!(
            "✅ Top-up #{} approved. {amount} has been added to your balance.",
            request.id
        ),
        (ModerationKind::TopUpConfirmation, Decision::Decline) => {
            format!("❌ Top-up #{} was declined.", request.id)
        }
    };
    Notice::text(text)
}
