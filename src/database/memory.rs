//! In-process store used by the test-suite and by local runs without `DATABASE_URL`.
//!
//! All state sits behind one `tokio::sync::Mutex`, so every operation is serialized. Each
//! operation validates against the locked state before touching it, which gives the same
//! all-or-nothing behaviour the Postgres transactions provide.

use super::models::{
    Account, AccountId, CurrencyPackage, Decision, DigitalGood, GoodStatus, LedgerEntry,
    ModerationRequest, ModerationStatus, NewGood, NewModeration, NewPackage, PackageKind,
    Registration,
};
use super::{
    CatalogStore, ConfigStore, LedgerStore, ModerationStore, ensure_positive, ensure_request_amount,
    next_balance,
};
use crate::error::{BotError, BotResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    accounts: HashMap<AccountId, Account>,
    ledger: Vec<LedgerEntry>,
    packages: BTreeMap<i64, CurrencyPackage>,
    goods: BTreeMap<i64, DigitalGood>,
    requests: BTreeMap<i64, ModerationRequest>,
    config: HashMap<String, String>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn account_mut(&mut self, id: AccountId) -> BotResult<&mut Account> {
        self.accounts
            .get_mut(&id)
            .ok_or_else(|| BotError::not_found(format!("Account {id}")))
    }

    /// Checks that `delta` can be applied to `id` without writing anything.
    fn check_delta(&self, id: AccountId, delta: Decimal) -> BotResult<Decimal> {
        let account = self
            .accounts
            .get(&id)
            .ok_or_else(|| BotError::not_found(format!("Account {id}")))?;
        next_balance(account.balance, delta)
    }

    /// Applies a delta that `check_delta` accepts and appends its ledger entry.
    fn apply_delta(&mut self, id: AccountId, delta: Decimal, reason: &str) -> BotResult<Decimal> {
        let balance = self.check_delta(id, delta)?;
        let entry_id = self.next_id();
        self.account_mut(id)?.balance = balance;
        self.ledger.push(LedgerEntry {
            id: entry_id,
            account: id,
            amount: delta,
            reason: reason.to_string(),
            created_at: Utc::now(),
        });
        Ok(balance)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of ledger entries across all accounts.
    pub async fn ledger_len(&self) -> usize {
        self.inner.lock().await.ledger.len()
    }

    /// Overwrites tier fields directly; lets tests age a tier without waiting.
    pub async fn force_tier(&self, id: AccountId, tier: i32, expires_at: Option<DateTime<Utc>>) {
        if let Some(acc) = self.inner.lock().await.accounts.get_mut(&id) {
            acc.tier = tier;
            acc.tier_expires_at = expires_at;
        }
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn register(
        &self,
        id: AccountId,
        referrer: Option<AccountId>,
        referral_reward: Decimal,
    ) -> BotResult<Registration> {
        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.accounts.get(&id) {
            return Ok(Registration {
                account: existing.clone(),
                created: false,
                referral_paid: None,
            });
        }
        let referrer = referrer.filter(|r| *r != id && inner.accounts.contains_key(r));
        let pays_reward = referrer.is_some() && referral_reward > Decimal::ZERO;
        if let (Some(r), true) = (referrer, pays_reward) {
            inner.check_delta(r, referral_reward)?;
        }
        inner
            .accounts
            .insert(id, Account::new(id, referrer, Utc::now()));
        let mut referral_paid = None;
        if let (Some(r), true) = (referrer, pays_reward) {
            inner.apply_delta(r, referral_reward, &format!("Referral bonus: {id}"))?;
            referral_paid = Some((r, referral_reward));
        }
        let account = inner.account_mut(id)?.clone();
        Ok(Registration {
            account,
            created: true,
            referral_paid,
        })
    }

    async fn account(&self, id: AccountId) -> BotResult<Option<Account>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.accounts.get_mut(&id).map(|acc| {
            acc.clear_expired_tier(Utc::now());
            acc.clone()
        }))
    }

    async fn credit(&self, id: AccountId, amount: Decimal, reason: &str) -> BotResult<Decimal> {
        ensure_positive(amount)?;
        self.inner.lock().await.apply_delta(id, amount, reason)
    }

    async fn debit(&self, id: AccountId, amount: Decimal, reason: &str) -> BotResult<Decimal> {
        ensure_positive(amount)?;
        self.inner.lock().await.apply_delta(id, -amount, reason)
    }

    async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> BotResult<(Decimal, Decimal)> {
        ensure_positive(amount)?;
        if from == to {
            return Err(BotError::invalid("You cannot transfer to yourself."));
        }
        let mut inner = self.inner.lock().await;
        if !inner.accounts.contains_key(&to) {
            return Err(BotError::not_found(format!("Account {to}")));
        }
        inner.check_delta(from, -amount)?;
        inner.check_delta(to, amount)?;
        let from_balance = inner.apply_delta(from, -amount, &format!("Transfer to {to}"))?;
        let to_balance = inner.apply_delta(to, amount, &format!("Transfer from {from}"))?;
        Ok((from_balance, to_balance))
    }

    async fn purchase_tier(
        &self,
        id: AccountId,
        tier: i32,
        expires_at: DateTime<Utc>,
        cost: Decimal,
    ) -> BotResult<Account> {
        let mut inner = self.inner.lock().await;
        inner.apply_delta(id, -cost, &format!("Status tier {tier}"))?;
        let account = inner.account_mut(id)?;
        account.tier = tier;
        account.tier_expires_at = Some(expires_at);
        Ok(account.clone())
    }

    async fn unlock_clicker(&self, id: AccountId, cost: Decimal) -> BotResult<Account> {
        let mut inner = self.inner.lock().await;
        if inner.account_mut(id)?.clicker_unlocked {
            return Err(BotError::invalid("The clicker is already unlocked."));
        }
        inner.apply_delta(id, -cost, "Clicker unlock")?;
        let account = inner.account_mut(id)?;
        account.clicker_unlocked = true;
        Ok(account.clone())
    }

    async fn history(&self, id: AccountId, limit: i64) -> BotResult<Vec<LedgerEntry>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .ledger
            .iter()
            .rev()
            .filter(|e| e.account == id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_packages(&self, kind: Option<PackageKind>) -> BotResult<Vec<CurrencyPackage>> {
        let inner = self.inner.lock().await;
        let mut list: Vec<CurrencyPackage> = inner
            .packages
            .values()
            .filter(|p| kind.is_none_or(|k| p.kind == k))
            .cloned()
            .collect();
        list.sort_by(|a, b| {
            a.kind
                .as_str()
                .cmp(b.kind.as_str())
                .then(a.price.cmp(&b.price))
                .then(a.id.cmp(&b.id))
        });
        Ok(list)
    }

    async fn package(&self, id: i64) -> BotResult<Option<CurrencyPackage>> {
        Ok(self.inner.lock().await.packages.get(&id).cloned())
    }

    async fn create_package(&self, new: NewPackage) -> BotResult<CurrencyPackage> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let package = CurrencyPackage {
            id,
            kind: new.kind,
            title: new.title,
            quantity: new.quantity,
            price: new.price,
            alt_price: new.alt_price,
        };
        inner.packages.insert(id, package.clone());
        Ok(package)
    }

    async fn update_package_price(
        &self,
        id: i64,
        price: Decimal,
        alt_price: Decimal,
    ) -> BotResult<CurrencyPackage> {
        let mut inner = self.inner.lock().await;
        let package = inner
            .packages
            .get_mut(&id)
            .ok_or_else(|| BotError::not_found(format!("Package #{id}")))?;
        package.price = price;
        package.alt_price = alt_price;
        Ok(package.clone())
    }

    async fn delete_package(&self, id: i64) -> BotResult<()> {
        self.inner
            .lock()
            .await
            .packages
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BotError::not_found(format!("Package #{id}")))
    }

    async fn list_active_goods(&self) -> BotResult<Vec<DigitalGood>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .goods
            .values()
            .filter(|g| g.status == GoodStatus::Active)
            .cloned()
            .collect())
    }

    async fn good(&self, id: i64) -> BotResult<Option<DigitalGood>> {
        Ok(self.inner.lock().await.goods.get(&id).cloned())
    }

    async fn create_good(&self, new: NewGood) -> BotResult<DigitalGood> {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let good = DigitalGood {
            id,
            name: new.name,
            description: new.description,
            preview: new.preview,
            price: new.price,
            payload: new.payload,
            status: GoodStatus::Active,
        };
        inner.goods.insert(id, good.clone());
        Ok(good)
    }

    async fn delete_good(&self, id: i64) -> BotResult<()> {
        self.inner
            .lock()
            .await
            .goods
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BotError::not_found(format!("Good #{id}")))
    }

    async fn purchase_good(
        &self,
        buyer: AccountId,
        good_id: i64,
        price: Decimal,
    ) -> BotResult<DigitalGood> {
        let mut inner = self.inner.lock().await;
        let name = match inner.goods.get(&good_id) {
            Some(g) if g.status == GoodStatus::Active => g.name.clone(),
            _ => return Err(BotError::not_found(format!("Good #{good_id}"))),
        };
        inner.apply_delta(buyer, -price, &format!("Purchase: {name}"))?;
        let good = inner
            .goods
            .get_mut(&good_id)
            .ok_or_else(|| BotError::not_found(format!("Good #{good_id}")))?;
        good.status = GoodStatus::Sold;
        Ok(good.clone())
    }
}

#[async_trait]
impl ModerationStore for MemoryStore {
    async fn open_request(
        &self,
        new: NewModeration,
        reserve: Option<&str>,
    ) -> BotResult<ModerationRequest> {
        ensure_request_amount(&new)?;
        let mut inner = self.inner.lock().await;
        if !inner.accounts.contains_key(&new.requester) {
            return Err(BotError::not_found(format!("Account {}", new.requester)));
        }
        if let Some(reason) = reserve {
            inner.apply_delta(new.requester, -new.amount, reason)?;
        }
        let id = inner.next_id();
        let request = ModerationRequest {
            id,
            requester: new.requester,
            kind: new.kind,
            amount: new.amount,
            context: new.context,
            status: ModerationStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        };
        inner.requests.insert(id, request.clone());
        Ok(request)
    }

    async fn request(&self, id: i64) -> BotResult<Option<ModerationRequest>> {
        Ok(self.inner.lock().await.requests.get(&id).cloned())
    }

    async fn resolve_request(&self, id: i64, decision: Decision) -> BotResult<ModerationRequest> {
        let mut inner = self.inner.lock().await;
        let request = inner
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| BotError::not_found(format!("Request #{id}")))?;
        if request.status != ModerationStatus::Pending {
            return Err(BotError::AlreadyResolved(id));
        }
        if let Some((amount, reason)) = request.settlement(decision) {
            inner.apply_delta(request.requester, amount, &reason)?;
        }
        let stored = inner
            .requests
            .get_mut(&id)
            .ok_or_else(|| BotError::not_found(format!("Request #{id}")))?;
        stored.status = decision.resulting_status();
        stored.resolved_at = Some(Utc::now());
        Ok(stored.clone())
    }

    async fn pending_requests(&self) -> BotResult<Vec<ModerationRequest>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .requests
            .values()
            .filter(|r| r.status == ModerationStatus::Pending)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get_or_init(&self, key: &str, default: &str) -> BotResult<String> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .config
            .entry(key.to_string())
            .or_insert_with(|| default.to_string())
            .clone())
    }

    async fn set(&self, key: &str, value: &str) -> BotResult<()> {
        self.inner
            .lock()
            .await
            .config
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn config_first_read_persists_default() {
        let store = MemoryStore::new();
        assert_eq!(store.get_or_init("k", "1").await.unwrap(), "1");
        // A later read with another default keeps the first value.
        assert_eq!(store.get_or_init("k", "2").await.unwrap(), "1");
        store.set("k", "3").await.unwrap();
        assert_eq!(store.get_or_init("k", "2").await.unwrap(), "3");
    }

    #[tokio::test]
    async fn debit_of_unknown_account_is_not_found() {
        let store = MemoryStore::new();
        let err = store.debit(AccountId(9), dec!(1), "x").await.unwrap_err();
        assert!(matches!(err, BotError::NotFound(_)));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let store = MemoryStore::new();
        let id = AccountId(1);
        store.register(id, None, dec!(0)).await.unwrap();
        for i in 1..=7 {
            store.credit(id, Decimal::from(i), "c").await.unwrap();
        }
        let h = store.history(id, 5).await.unwrap();
        assert_eq!(h.len(), 5);
        assert_eq!(h[0].amount, dec!(7));
        assert_eq!(h[4].amount, dec!(3));
    }
}
