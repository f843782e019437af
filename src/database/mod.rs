//! This module acts as a central hub for all persistence logic.
//!
//! The store is split by concern into four traits. `PgStore` implements them on top of a
//! Postgres pool (one transaction per operation, row locks for exclusivity), `MemoryStore`
//! implements them behind a single mutex for tests and local runs. Both must uphold the same
//! contract: a failed precondition leaves no trace, and balance and ledger move together.

pub mod catalog;
pub mod ledger;
pub mod memory;
pub mod models;
pub mod moderation;
pub mod pg;
pub mod settings;

use crate::constants::AMOUNT_CEILING;
use crate::error::{BotError, BotResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use models::{
    Account, AccountId, CurrencyPackage, Decision, DigitalGood, LedgerEntry, ModerationRequest,
    NewGood, NewModeration, NewPackage, PackageKind, Registration, ReservationPolicy,
};
use rust_decimal::Decimal;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Whether `amount` fits the money columns: at most two decimal places and below the ceiling.
pub fn is_storable(amount: Decimal) -> bool {
    amount.abs() < Decimal::from(AMOUNT_CEILING) && amount.normalize().scale() <= 2
}

/// Reject zero, negative and unstorable amounts before anything is written.
pub fn ensure_positive(amount: Decimal) -> BotResult<()> {
    if amount <= Decimal::ZERO || !is_storable(amount) {
        return Err(BotError::InvalidAmount(amount));
    }
    Ok(())
}

/// Balance after applying `delta`. Overdrafts are `InsufficientFunds`; a result the money
/// columns cannot hold is `InvalidAmount`.
pub fn next_balance(balance: Decimal, delta: Decimal) -> BotResult<Decimal> {
    let next = balance
        .checked_add(delta)
        .filter(|b| *b < Decimal::from(AMOUNT_CEILING))
        .ok_or(BotError::InvalidAmount(delta))?;
    if next < Decimal::ZERO {
        return Err(BotError::InsufficientFunds {
            balance,
            required: -delta,
        });
    }
    Ok(next)
}

/// Purchase requests may be free (a full discount); top-ups must move money.
pub fn ensure_request_amount(new: &NewModeration) -> BotResult<()> {
    match new.kind.reservation() {
        ReservationPolicy::CreditOnAccept => ensure_positive(new.amount),
        ReservationPolicy::DebitOnRaise
            if new.amount < Decimal::ZERO || !is_storable(new.amount) =>
        {
            Err(BotError::InvalidAmount(new.amount))
        }
        ReservationPolicy::DebitOnRaise => Ok(()),
    }
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Create the account on first contact. When `referrer` is set, exists and differs from `id`,
    /// the referrer is credited `referral_reward` in the same unit. Repeated calls are no-ops.
    async fn register(
        &self,
        id: AccountId,
        referrer: Option<AccountId>,
        referral_reward: Decimal,
    ) -> BotResult<Registration>;

    /// Read an account, clearing an expired tier on the way.
    async fn account(&self, id: AccountId) -> BotResult<Option<Account>>;

    async fn credit(&self, id: AccountId, amount: Decimal, reason: &str) -> BotResult<Decimal>;

    /// Fails with `InsufficientFunds` (and writes nothing) when `balance < amount`.
    async fn debit(&self, id: AccountId, amount: Decimal, reason: &str) -> BotResult<Decimal>;

    /// Debit `from` and credit `to` as one unit. Returns the two new balances.
    async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> BotResult<(Decimal, Decimal)>;

    /// Charge `cost` and set the tier with its expiry in one unit.
    async fn purchase_tier(
        &self,
        id: AccountId,
        tier: i32,
        expires_at: DateTime<Utc>,
        cost: Decimal,
    ) -> BotResult<Account>;

    async fn unlock_clicker(&self, id: AccountId, cost: Decimal) -> BotResult<Account>;

    /// Most recent entries first.
    async fn history(&self, id: AccountId, limit: i64) -> BotResult<Vec<LedgerEntry>>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_packages(&self, kind: Option<PackageKind>) -> BotResult<Vec<CurrencyPackage>>;
    async fn package(&self, id: i64) -> BotResult<Option<CurrencyPackage>>;
    async fn create_package(&self, new: NewPackage) -> BotResult<CurrencyPackage>;
    async fn update_package_price(
        &self,
        id: i64,
        price: Decimal,
        alt_price: Decimal,
    ) -> BotResult<CurrencyPackage>;
    async fn delete_package(&self, id: i64) -> BotResult<()>;

    async fn list_active_goods(&self) -> BotResult<Vec<DigitalGood>>;
    async fn good(&self, id: i64) -> BotResult<Option<DigitalGood>>;
    async fn create_good(&self, new: NewGood) -> BotResult<DigitalGood>;
    async fn delete_good(&self, id: i64) -> BotResult<()>;

    /// Debit the buyer and retire the good in one unit. A good that is no longer active is
    /// `NotFound`; nothing is charged in that case.
    async fn purchase_good(
        &self,
        buyer: AccountId,
        good_id: i64,
        price: Decimal,
    ) -> BotResult<DigitalGood>;
}

#[async_trait]
pub trait ModerationStore: Send + Sync {
    /// Persist a pending request. With `reserve` set the requester is debited `amount` in the
    /// same unit, using `reserve` as the ledger reason.
    async fn open_request(
        &self,
        new: NewModeration,
        reserve: Option<&str>,
    ) -> BotResult<ModerationRequest>;

    async fn request(&self, id: i64) -> BotResult<Option<ModerationRequest>>;

    /// Resolve a pending request exactly once and apply `ModerationRequest::settlement` for the
    /// decision. A second call fails with `AlreadyResolved`.
    async fn resolve_request(&self, id: i64, decision: Decision) -> BotResult<ModerationRequest>;

    async fn pending_requests(&self) -> BotResult<Vec<ModerationRequest>>;
}

#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Return the stored value; when absent, persist `default` and return it.
    async fn get_or_init(&self, key: &str, default: &str) -> BotResult<String>;
    async fn set(&self, key: &str, value: &str) -> BotResult<()>;
}

/// Everything the bot needs from persistence.
pub trait Store: LedgerStore + CatalogStore + ModerationStore + ConfigStore {}

impl<T> Store for T where T: LedgerStore + CatalogStore + ModerationStore + ConfigStore {}

/// Default catalog seeded when no packages exist yet.
pub fn default_packages() -> Vec<NewPackage> {
    // alt prices are given in cents
    let p = |kind, title: &str, quantity: i64, price: i64, alt_cents: i64| NewPackage {
        kind,
        title: title.to_string(),
        quantity,
        price: Decimal::from(price),
        alt_price: Decimal::new(alt_cents, 2),
    };
    vec![
        p(PackageKind::Currency, "60 UC", 60, 12_000, 99),
        p(PackageKind::Currency, "325 UC", 325, 60_000, 499),
        p(PackageKind::Currency, "660 UC", 660, 115_000, 999),
        p(PackageKind::Popularity, "Motorcycle", 1, 5_000, 45),
        p(PackageKind::Popularity, "Car", 1, 15_000, 125),
    ]
}

/// Seed the default packages when the catalog is empty.
pub async fn seed_catalog(store: &dyn Store) -> BotResult<usize> {
    if !store.list_packages(None).await?.is_empty() {
        return Ok(0);
    }
    let defaults = default_packages();
    let n = defaults.len();
    for p in defaults {
        store.create_package(p).await?;
    }
    tracing::info!(target = "catalog", seeded = n, "Seeded default currency packages");
    Ok(n)
}
