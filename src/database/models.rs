//! Contains all the data structures that map to store records or query results.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serenity::model::id::UserId;
use std::fmt;
use std::str::FromStr;

/// Opaque, externally assigned user id (the chat platform's user id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub u64);

impl AccountId {
    pub fn get(self) -> u64 {
        self.0
    }

    /// Postgres has no unsigned BIGINT; ids are stored bit-for-bit as i64.
    pub fn as_db(self) -> i64 {
        self.0 as i64
    }

    pub fn from_db(raw: i64) -> Self {
        AccountId(raw as u64)
    }
}

impl From<UserId> for AccountId {
    fn from(id: UserId) -> Self {
        AccountId(id.get())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u64>() {
            Ok(0) | Err(_) => Err(()),
            Ok(v) => Ok(AccountId(v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub balance: Decimal,
    pub tier: i32,
    pub tier_expires_at: Option<DateTime<Utc>>,
    pub referrer: Option<AccountId>,
    pub clicker_unlocked: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: AccountId, referrer: Option<AccountId>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            balance: Decimal::ZERO,
            tier: 0,
            tier_expires_at: None,
            referrer,
            clicker_unlocked: false,
            created_at: now,
        }
    }

    /// Tier and expiry are cleared together once the expiry has passed.
    pub fn tier_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.tier_expires_at, Some(at) if at <= now)
    }

    pub fn clear_expired_tier(&mut self, now: DateTime<Utc>) -> bool {
        if self.tier_expired(now) {
            self.tier = 0;
            self.tier_expires_at = None;
            true
        } else {
            false
        }
    }
}

/// Immutable audit record of a balance mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub id: i64,
    pub account: AccountId,
    pub amount: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Result of `LedgerStore::register`.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub account: Account,
    pub created: bool,
    /// Set when this registration paid a referral reward: (referrer, reward).
    pub referral_paid: Option<(AccountId, Decimal)>,
}

// --- Catalog ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    /// Virtual currency units.
    Currency,
    /// Popularity boosts.
    Popularity,
}

impl PackageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageKind::Currency => "uc",
            PackageKind::Popularity => "pop",
        }
    }
}

impl FromStr for PackageKind {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uc" | "currency" => Ok(PackageKind::Currency),
            "pop" | "popularity" => Ok(PackageKind::Popularity),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyPackage {
    pub id: i64,
    pub kind: PackageKind,
    pub title: String,
    pub quantity: i64,
    /// Price in the balance currency; this is what gets charged.
    pub price: Decimal,
    /// Price in the secondary external currency, display only.
    pub alt_price: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPackage {
    pub kind: PackageKind,
    pub title: String,
    pub quantity: i64,
    pub price: Decimal,
    pub alt_price: Decimal,
}

/// Media reference produced by the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    Photo(String),
    Video(String),
}

impl Media {
    pub fn kind(&self) -> &'static str {
        match self {
            Media::Photo(_) => "photo",
            Media::Video(_) => "video",
        }
    }

    pub fn reference(&self) -> &str {
        match self {
            Media::Photo(r) | Media::Video(r) => r,
        }
    }

    pub fn from_parts(kind: &str, reference: String) -> Option<Self> {
        match kind {
            "photo" => Some(Media::Photo(reference)),
            "video" => Some(Media::Video(reference)),
            _ => None,
        }
    }
}

/// What the buyer receives once a digital good is paid for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    File(String),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Text(_) => "text",
            Payload::File(_) => "file",
        }
    }

    pub fn reference(&self) -> &str {
        match self {
            Payload::Text(r) | Payload::File(r) => r,
        }
    }

    pub fn from_parts(kind: &str, reference: String) -> Option<Self> {
        match kind {
            "text" => Some(Payload::Text(reference)),
            "file" => Some(Payload::File(reference)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoodStatus {
    Active,
    Sold,
}

impl GoodStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoodStatus::Active => "active",
            GoodStatus::Sold => "sold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(GoodStatus::Active),
            "sold" => Some(GoodStatus::Sold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DigitalGood {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub preview: Option<Media>,
    pub price: Decimal,
    pub payload: Payload,
    pub status: GoodStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGood {
    pub name: String,
    pub description: String,
    pub preview: Option<Media>,
    pub price: Decimal,
    pub payload: Payload,
}

// --- Moderation ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModerationKind {
    PurchaseConfirmation,
    TopUpConfirmation,
}

/// When the ledger effect of a moderated action happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationPolicy {
    /// Funds are debited when the request is raised and refunded on decline.
    DebitOnRaise,
    /// Nothing moves until the admin accepts; accept credits.
    CreditOnAccept,
}

impl ModerationKind {
    pub fn reservation(&self) -> ReservationPolicy {
        match self {
            ModerationKind::PurchaseConfirmation => ReservationPolicy::DebitOnRaise,
            ModerationKind::TopUpConfirmation => ReservationPolicy::CreditOnAccept,
        }
    }

    /// Short code embedded in action tokens and stored in the `kind` column.
    pub fn code(&self) -> &'static str {
        match self {
            ModerationKind::PurchaseConfirmation => "buy",
            ModerationKind::TopUpConfirmation => "topup",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "buy" => Some(ModerationKind::PurchaseConfirmation),
            "topup" => Some(ModerationKind::TopUpConfirmation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationStatus {
    Pending,
    Approved,
    Declined,
}

impl ModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Pending => "pending",
            ModerationStatus::Approved => "approved",
            ModerationStatus::Declined => "declined",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ModerationStatus::Pending),
            "approved" => Some(ModerationStatus::Approved),
            "declined" => Some(ModerationStatus::Declined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Decline,
}

impl Decision {
    pub fn resulting_status(&self) -> ModerationStatus {
        match self {
            Decision::Approve => ModerationStatus::Approved,
            Decision::Decline => ModerationStatus::Declined,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewModeration {
    pub requester: AccountId,
    pub kind: ModerationKind,
    pub amount: Decimal,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModerationRequest {
    pub id: i64,
    pub requester: AccountId,
    pub kind: ModerationKind,
    pub amount: Decimal,
    pub context: String,
    pub status: ModerationStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ModerationRequest {
    /// Credit (amount, reason) owed to the requester when this request is resolved with `decision`.
    /// Debit-on-raise kinds refund on decline; credit-on-accept kinds credit on approve.
    pub fn settlement(&self, decision: Decision) -> Option<(Decimal, String)> {
        match (self.kind.reservation(), decision) {
            (ReservationPolicy::DebitOnRaise, Decision::Decline) => {
                Some((self.amount, format!("Refund: order #{} declined", self.id)))
            }
            (ReservationPolicy::CreditOnAccept, Decision::Approve) => {
                Some((self.amount, format!("Top-up #{} approved", self.id)))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(kind: ModerationKind) -> ModerationRequest {
        ModerationRequest {
            id: 7,
            requester: AccountId(1),
            kind,
            amount: dec!(60000),
            context: String::new(),
            status: ModerationStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn purchase_refunds_only_on_decline() {
        let r = request(ModerationKind::PurchaseConfirmation);
        assert_eq!(r.settlement(Decision::Approve), None);
        let (amount, _) = r.settlement(Decision::Decline).unwrap();
        assert_eq!(amount, dec!(60000));
    }

    #[test]
    fn topup_credits_only_on_approve() {
        let r = request(ModerationKind::TopUpConfirmation);
        assert!(r.settlement(Decision::Approve).is_some());
        assert_eq!(r.settlement(Decision::Decline), None);
    }

    #[test]
    fn expired_tier_clears_both_fields() {
        let now = Utc::now();
        let mut acc = Account::new(AccountId(5), None, now);
        acc.tier = 2;
        acc.tier_expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(acc.clear_expired_tier(now));
        assert_eq!(acc.tier, 0);
        assert!(acc.tier_expires_at.is_none());
    }

    #[test]
    fn account_id_rejects_zero_and_garbage() {
        assert!("0".parse::<AccountId>().is_err());
        assert!("abc".parse::<AccountId>().is_err());
        assert_eq!("42".parse::<AccountId>(), Ok(AccountId(42)));
    }
}
