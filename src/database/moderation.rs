//! Postgres functions for the `moderation_requests` table.

use super::ledger::apply_delta;
use super::models::{
    AccountId, Decision, ModerationKind, ModerationRequest, ModerationStatus, NewModeration,
};
use crate::error::{BotError, BotResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

#[derive(sqlx::FromRow, Debug)]
struct RequestRow {
    request_id: i64,
    requester_id: i64,
    kind: String,
    amount: Decimal,
    context: String,
    status: String,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<RequestRow> for ModerationRequest {
    type Error = BotError;
    fn try_from(r: RequestRow) -> Result<Self, Self::Error> {
        let kind = ModerationKind::from_code(&r.kind)
            .ok_or_else(|| BotError::Persistence(format!("unknown request kind '{}'", r.kind)))?;
        let status = ModerationStatus::parse(&r.status).ok_or_else(|| {
            BotError::Persistence(format!("unknown request status '{}'", r.status))
        })?;
        Ok(ModerationRequest {
            id: r.request_id,
            requester: AccountId::from_db(r.requester_id),
            kind,
            amount: r.amount,
            context: r.context,
            status,
            created_at: r.created_at,
            resolved_at: r.resolved_at,
        })
    }
}

const REQUEST_COLUMNS: &str =
    "request_id, requester_id, kind, amount, context, status, created_at, resolved_at";

#[instrument(level = "debug", skip(pool, new), fields(requester = %new.requester, kind = new.kind.code()))]
pub async fn open_request(
    pool: &PgPool,
    new: NewModeration,
    reserve: Option<&str>,
) -> BotResult<ModerationRequest> {
    let mut tx = pool.begin().await?;
    if let Some(reason) = reserve {
        apply_delta(&mut tx, new.requester, -new.amount, reason).await?;
    }
    let row = sqlx::query_as::<_, RequestRow>(&format!(
        "INSERT INTO moderation_requests (requester_id, kind, amount, context) VALUES ($1, $2, $3, $4) RETURNING {REQUEST_COLUMNS}"
    ))
    .bind(new.requester.as_db())
    .bind(new.kind.code())
    .bind(new.amount)
    .bind(&new.context)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    row.try_into()
}

pub async fn get_request(pool: &PgPool, id: i64) -> BotResult<Option<ModerationRequest>> {
    sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM moderation_requests WHERE request_id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .map(ModerationRequest::try_from)
    .transpose()
}

/// Takes the request row lock, so two admins (or a double tap) racing on the same request
/// resolve it once; the loser sees `AlreadyResolved`.
#[instrument(level = "debug", skip(pool))]
pub async fn resolve_request(
    pool: &PgPool,
    id: i64,
    decision: Decision,
) -> BotResult<ModerationRequest> {
    let mut tx = pool.begin().await?;
    let request: ModerationRequest = sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM moderation_requests WHERE request_id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| BotError::not_found(format!("Request #{id}")))?
    .try_into()?;
    if request.status != ModerationStatus::Pending {
        return Err(BotError::AlreadyResolved(id));
    }
    if let Some((amount, reason)) = request.settlement(decision) {
        apply_delta(&mut tx, request.requester, amount, &reason).await?;
    }
    let row = sqlx::query_as::<_, RequestRow>(&format!(
        "UPDATE moderation_requests SET status = $2, resolved_at = NOW() WHERE request_id = $1 RETURNING {REQUEST_COLUMNS}"
    ))
    .bind(id)
    .bind(decision.resulting_status().as_str())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    row.try_into()
}

pub async fn pending_requests(pool: &PgPool) -> BotResult<Vec<ModerationRequest>> {
    let rows = sqlx::query_as::<_, RequestRow>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM moderation_requests WHERE status = 'pending' ORDER BY created_at, request_id"
    ))
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(ModerationRequest::try_from).collect()
}
