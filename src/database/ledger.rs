//! Postgres functions for the `accounts` and `ledger_entries` tables.
//!
//! Every mutation runs inside the caller's transaction and takes the account row with
//! `FOR UPDATE` first, so concurrent sessions touching the same account are serialized by the
//! row lock. Balance and the matching ledger entry are always written together.

use super::models::{Account, AccountId, LedgerEntry, Registration};
use super::next_balance;
use crate::error::{BotError, BotResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

#[derive(sqlx::FromRow, Debug)]
pub(crate) struct AccountRow {
    account_id: i64,
    balance: Decimal,
    tier: i32,
    tier_expires_at: Option<DateTime<Utc>>,
    referrer_id: Option<i64>,
    clicker_unlocked: bool,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(r: AccountRow) -> Self {
        Account {
            id: AccountId::from_db(r.account_id),
            balance: r.balance,
            tier: r.tier,
            tier_expires_at: r.tier_expires_at,
            referrer: r.referrer_id.map(AccountId::from_db),
            clicker_unlocked: r.clicker_unlocked,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow, Debug)]
struct EntryRow {
    entry_id: i64,
    account_id: i64,
    amount: Decimal,
    reason: String,
    created_at: DateTime<Utc>,
}

const ACCOUNT_COLUMNS: &str =
    "account_id, balance, tier, tier_expires_at, referrer_id, clicker_unlocked, created_at";

/// Locks and returns the account row for the rest of the transaction.
pub(crate) async fn lock_account(
    tx: &mut Transaction<'_, Postgres>,
    id: AccountId,
) -> BotResult<Option<Account>> {
    let row = sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1 FOR UPDATE"
    ))
    .bind(id.as_db())
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(Account::from))
}

/// Applies a signed delta to a locked account and appends the ledger entry.
/// Returns the new balance; a delta that would take the balance below zero writes nothing.
pub(crate) async fn apply_delta(
    tx: &mut Transaction<'_, Postgres>,
    id: AccountId,
    delta: Decimal,
    reason: &str,
) -> BotResult<Decimal> {
    let account = lock_account(tx, id)
        .await?
        .ok_or_else(|| BotError::not_found(format!("Account {id}")))?;
    let new_balance = next_balance(account.balance, delta)?;
    sqlx::query("UPDATE accounts SET balance = $2 WHERE account_id = $1")
        .bind(id.as_db())
        .bind(new_balance)
        .execute(&mut **tx)
        .await?;
    sqlx::query("INSERT INTO ledger_entries (account_id, amount, reason) VALUES ($1, $2, $3)")
        .bind(id.as_db())
        .bind(delta)
        .bind(reason)
        .execute(&mut **tx)
        .await?;
    Ok(new_balance)
}

#[instrument(level = "debug", skip(pool))]
pub async fn register(
    pool: &PgPool,
    id: AccountId,
    referrer: Option<AccountId>,
    referral_reward: Decimal,
) -> BotResult<Registration> {
    let mut tx = pool.begin().await?;
    let referrer = match referrer.filter(|r| *r != id) {
        Some(r) => lock_account(&mut tx, r).await?.map(|acc| acc.id),
        None => None,
    };
    let inserted = sqlx::query(
        "INSERT INTO accounts (account_id, referrer_id) VALUES ($1, $2) ON CONFLICT (account_id) DO NOTHING",
    )
    .bind(id.as_db())
    .bind(referrer.map(AccountId::as_db))
    .execute(&mut *tx)
    .await?
    .rows_affected()
        == 1;

    let mut referral_paid = None;
    if inserted {
        if let Some(r) = referrer {
            if referral_reward > Decimal::ZERO {
                apply_delta(&mut tx, r, referral_reward, &format!("Referral bonus: {id}")).await?;
                referral_paid = Some((r, referral_reward));
            }
        }
    }
    let account = lock_account(&mut tx, id)
        .await?
        .ok_or_else(|| BotError::not_found(format!("Account {id}")))?;
    tx.commit().await?;
    Ok(Registration {
        account,
        created: inserted,
        referral_paid,
    })
}

/// Reads the account, first clearing a tier whose expiry has passed.
pub async fn get_account(pool: &PgPool, id: AccountId) -> BotResult<Option<Account>> {
    sqlx::query(
        "UPDATE accounts SET tier = 0, tier_expires_at = NULL WHERE account_id = $1 AND tier_expires_at IS NOT NULL AND tier_expires_at <= NOW()",
    )
    .bind(id.as_db())
    .execute(pool)
    .await?;
    let row = sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1"
    ))
    .bind(id.as_db())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Account::from))
}

#[instrument(level = "debug", skip(pool))]
pub async fn change_balance(
    pool: &PgPool,
    id: AccountId,
    delta: Decimal,
    reason: &str,
) -> BotResult<Decimal> {
    let mut tx = pool.begin().await?;
    let balance = apply_delta(&mut tx, id, delta, reason).await?;
    tx.commit().await?;
    Ok(balance)
}

#[instrument(level = "debug", skip(pool))]
pub async fn transfer(
    pool: &PgPool,
    from: AccountId,
    to: AccountId,
    amount: Decimal,
) -> BotResult<(Decimal, Decimal)> {
    if from == to {
        return Err(BotError::invalid("You cannot transfer to yourself."));
    }
    let mut tx = pool.begin().await?;
    // Lock in id order so two opposite transfers cannot deadlock.
    let (first, second) = if from < to { (from, to) } else { (to, from) };
    for id in [first, second] {
        if lock_account(&mut tx, id).await?.is_none() {
            return Err(BotError::not_found(format!("Account {id}")));
        }
    }
    let from_balance = apply_delta(&mut tx, from, -amount, &format!("Transfer to {to}")).await?;
    let to_balance = apply_delta(&mut tx, to, amount, &format!("Transfer from {from}")).await?;
    tx.commit().await?;
    Ok((from_balance, to_balance))
}

#[instrument(level = "debug", skip(pool))]
pub async fn purchase_tier(
    pool: &PgPool,
    id: AccountId,
    tier: i32,
    expires_at: DateTime<Utc>,
    cost: Decimal,
) -> BotResult<Account> {
    let mut tx = pool.begin().await?;
    apply_delta(&mut tx, id, -cost, &format!("Status tier {tier}")).await?;
    let row = sqlx::query_as::<_, AccountRow>(&format!(
        "UPDATE accounts SET tier = $2, tier_expires_at = $3 WHERE account_id = $1 RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(id.as_db())
    .bind(tier)
    .bind(expires_at)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(row.into())
}

#[instrument(level = "debug", skip(pool))]
pub async fn unlock_clicker(pool: &PgPool, id: AccountId, cost: Decimal) -> BotResult<Account> {
    let mut tx = pool.begin().await?;
    let account = lock_account(&mut tx, id)
        .await?
        .ok_or_else(|| BotError::not_found(format!("Account {id}")))?;
    if account.clicker_unlocked {
        return Err(BotError::invalid("The clicker is already unlocked."));
    }
    apply_delta(&mut tx, id, -cost, "Clicker unlock").await?;
    let row = sqlx::query_as::<_, AccountRow>(&format!(
        "UPDATE accounts SET clicker_unlocked = TRUE WHERE account_id = $1 RETURNING {ACCOUNT_COLUMNS}"
    ))
    .bind(id.as_db())
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(row.into())
}

pub async fn history(pool: &PgPool, id: AccountId, limit: i64) -> BotResult<Vec<LedgerEntry>> {
    let rows = sqlx::query_as::<_, EntryRow>(
        "SELECT entry_id, account_id, amount, reason, created_at FROM ledger_entries WHERE account_id = $1 ORDER BY created_at DESC, entry_id DESC LIMIT $2",
    )
    .bind(id.as_db())
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| LedgerEntry {
            id: r.entry_id,
            account: AccountId::from_db(r.account_id),
            amount: r.amount,
            reason: r.reason,
            created_at: r.created_at,
        })
        .collect())
}
