//! Postgres-backed store. Thin trait glue over the per-table function modules.

use super::models::{
    Account, AccountId, CurrencyPackage, Decision, DigitalGood, LedgerEntry, ModerationRequest,
    NewGood, NewModeration, NewPackage, PackageKind, Registration,
};
use super::{
    CatalogStore, ConfigStore, LedgerStore, ModerationStore, catalog, ensure_positive, ensure_request_amount, ledger,
    moderation, settings,
};
use crate::error::BotResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and applies the migrations under `migrations/`.
    pub async fn connect(url: &str, max_connections: u32) -> BotResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn register(
        &self,
        id: AccountId,
        referrer: Option<AccountId>,
        referral_reward: Decimal,
    ) -> BotResult<Registration> {
        ledger::register(&self.pool, id, referrer, referral_reward).await
    }

    async fn account(&self, id: AccountId) -> BotResult<Option<Account>> {
        ledger::get_account(&self.pool, id).await
    }

    async fn credit(&self, id: AccountId, amount: Decimal, reason: &str) -> BotResult<Decimal> {
        ensure_positive(amount)?;
        ledger::change_balance(&self.pool, id, amount, reason).await
    }

    async fn debit(&self, id: AccountId, amount: Decimal, reason: &str) -> BotResult<Decimal> {
        ensure_positive(amount)?;
        ledger::change_balance(&self.pool, id, -amount, reason).await
    }

    async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> BotResult<(Decimal, Decimal)> {
        ensure_positive(amount)?;
        ledger::transfer(&self.pool, from, to, amount).await
    }

    async fn purchase_tier(
        &self,
        id: AccountId,
        tier: i32,
        expires_at: DateTime<Utc>,
        cost: Decimal,
    ) -> BotResult<Account> {
        ledger::purchase_tier(&self.pool, id, tier, expires_at, cost).await
    }

    async fn unlock_clicker(&self, id: AccountId, cost: Decimal) -> BotResult<Account> {
        ledger::unlock_clicker(&self.pool, id, cost).await
    }

    async fn history(&self, id: AccountId, limit: i64) -> BotResult<Vec<LedgerEntry>> {
        ledger::history(&self.pool, id, limit).await
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_packages(&self, kind: Option<PackageKind>) -> BotResult<Vec<CurrencyPackage>> {
        catalog::list_packages(&self.pool, kind).await
    }

    async fn package(&self, id: i64) -> BotResult<Option<CurrencyPackage>> {
        catalog::get_package(&self.pool, id).await
    }

    async fn create_package(&self, new: NewPackage) -> BotResult<CurrencyPackage> {
        catalog::create_package(&self.pool, new).await
    }

    async fn update_package_price(
        &self,
        id: i64,
        price: Decimal,
        alt_price: Decimal,
    ) -> BotResult<CurrencyPackage> {
        catalog::update_package_price(&self.pool, id, price, alt_price).await
    }

    async fn delete_package(&self, id: i64) -> BotResult<()> {
        catalog::delete_package(&self.pool, id).await
    }

    async fn list_active_goods(&self) -> BotResult<Vec<DigitalGood>> {
        catalog::list_active_goods(&self.pool).await
    }

    async fn good(&self, id: i64) -> BotResult<Option<DigitalGood>> {
        catalog::get_good(&self.pool, id).await
    }

    async fn create_good(&self, new: NewGood) -> BotResult<DigitalGood> {
        catalog::create_good(&self.pool, new).await
    }

    async fn delete_good(&self, id: i64) -> BotResult<()> {
        catalog::delete_good(&self.pool, id).await
    }

    async fn purchase_good(
        &self,
        buyer: AccountId,
        good_id: i64,
        price: Decimal,
    ) -> BotResult<DigitalGood> {
        catalog::purchase_good(&self.pool, buyer, good_id, price).await
    }
}

#[async_trait]
impl ModerationStore for PgStore {
    async fn open_request(
        &self,
        new: NewModeration,
        reserve: Option<&str>,
    ) -> BotResult<ModerationRequest> {
        ensure_request_amount(&new)?;
        moderation::open_request(&self.pool, new, reserve).await
    }

    async fn request(&self, id: i64) -> BotResult<Option<ModerationRequest>> {
        moderation::get_request(&self.pool, id).await
    }

    async fn resolve_request(&self, id: i64, decision: Decision) -> BotResult<ModerationRequest> {
        moderation::resolve_request(&self.pool, id, decision).await
    }

    async fn pending_requests(&self) -> BotResult<Vec<ModerationRequest>> {
        moderation::pending_requests(&self.pool).await
    }
}

#[async_trait]
impl ConfigStore for PgStore {
    async fn get_or_init(&self, key: &str, default: &str) -> BotResult<String> {
        settings::get_or_init_config_value(&self.pool, key, default).await
    }

    async fn set(&self, key: &str, value: &str) -> BotResult<()> {
        settings::set_config_value(&self.pool, key, value).await
    }
}
