//! Tier policy and rate lookups.
//!
//! Every tunable number (limits, discounts, rewards, costs) lives in the config store under a
//! stable key. A key read for the first time is persisted with its default, so what the admin
//! sees in `rates` is exactly what the bot uses.

use crate::constants::MAX_STATUS_DAYS;
use crate::database::{Store, is_storable};
use crate::error::{BotError, BotResult};
use chrono::Duration;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// Highest purchasable status tier. Tier 0 is the default for every account.
pub const MAX_TIER: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rate {
    TransferLimit(i32),
    Discount(i32),
    ReferralReward(i32),
    ClickReward(i32),
    /// Price of a status tier (1..=MAX_TIER).
    StatusCost(i32),
    StatusDays,
    ClickerCost,
}

impl Rate {
    pub fn all() -> Vec<Rate> {
        let mut out = Vec::new();
        for t in 0..=MAX_TIER {
            out.push(Rate::TransferLimit(t));
            out.push(Rate::Discount(t));
            out.push(Rate::ReferralReward(t));
            out.push(Rate::ClickReward(t));
        }
        for t in 1..=MAX_TIER {
            out.push(Rate::StatusCost(t));
        }
        out.push(Rate::StatusDays);
        out.push(Rate::ClickerCost);
        out
    }

    pub fn key(&self) -> String {
        match self {
            Rate::TransferLimit(t) => format!("transfer_limit.{t}"),
            Rate::Discount(t) => format!("discount.{t}"),
            Rate::ReferralReward(t) => format!("referral_reward.{t}"),
            Rate::ClickReward(t) => format!("click_reward.{t}"),
            Rate::StatusCost(t) => format!("status_cost.{t}"),
            Rate::StatusDays => "status_days".to_string(),
            Rate::ClickerCost => "clicker_cost".to_string(),
        }
    }

    pub fn default_value(&self) -> Decimal {
        let by_tier = |t: &i32, table: [i64; 4]| Decimal::from(table[(*t).clamp(0, MAX_TIER) as usize]);
        match self {
            Rate::TransferLimit(t) => by_tier(t, [50_000, 150_000, 500_000, 2_000_000]),
            Rate::Discount(t) => [
                Decimal::ZERO,
                Decimal::new(3, 2),
                Decimal::new(5, 2),
                Decimal::new(10, 2),
            ][(*t).clamp(0, MAX_TIER) as usize],
            Rate::ReferralReward(t) => by_tier(t, [500, 750, 1_000, 1_500]),
            Rate::ClickReward(t) => by_tier(t, [1, 2, 3, 5]),
            Rate::StatusCost(t) => by_tier(t, [0, 20_000, 50_000, 120_000]),
            Rate::StatusDays => Decimal::from(30),
            Rate::ClickerCost => Decimal::from(10_000),
        }
    }

    /// Parse and range-check a raw value for this rate. Everything but a discount or the status
    /// duration is money and must fit the ledger columns.
    pub fn validate(&self, raw: &str) -> BotResult<Decimal> {
        let value = Decimal::from_str(raw.trim().replace([' ', '_'], "").as_str())
            .map_err(|_| BotError::invalid("Please send a number."))?;
        match self {
            Rate::Discount(_) if value < Decimal::ZERO || value > Decimal::ONE => Err(
                BotError::invalid("A discount is a fraction between 0 and 1, e.g. 0.05."),
            ),
            Rate::Discount(_) => Ok(value.normalize()),
            Rate::StatusDays
                if value < Decimal::ONE
                    || !value.fract().is_zero()
                    || value > Decimal::from(MAX_STATUS_DAYS) =>
            {
                Err(BotError::invalid(format!(
                    "The status duration is a whole number of days from 1 to {MAX_STATUS_DAYS}."
                )))
            }
            Rate::StatusDays => Ok(value.normalize()),
            _ if value < Decimal::ZERO => Err(BotError::invalid("The value cannot be negative.")),
            Rate::ClickReward(_) if value.is_zero() => {
                Err(BotError::invalid("A click reward must be above zero."))
            }
            _ if value.normalize().scale() > 2 => {
                Err(BotError::invalid("Use at most two decimal places."))
            }
            _ if !is_storable(value) => Err(BotError::InvalidAmount(value)),
            _ => Ok(value.normalize()),
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for Rate {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Rate::all().into_iter().find(|r| r.key() == s).ok_or(())
    }
}

/// Effective per-tier policy read from the config store.
#[derive(Debug, Clone, PartialEq)]
pub struct TierPolicy {
    pub tier: i32,
    pub transfer_limit: Decimal,
    pub discount: Decimal,
    pub referral_reward: Decimal,
    pub click_reward: Decimal,
}

/// `list * (1 - discount)` rounded to cents, never below zero.
pub fn final_price(list: Decimal, discount: Decimal) -> Decimal {
    (list * (Decimal::ONE - discount))
        .round_dp(2)
        .max(Decimal::ZERO)
}

#[derive(Clone)]
pub struct PricingPolicy {
    store: Arc<dyn Store>,
}

impl PricingPolicy {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// A stored value that no longer parses falls back to the default instead of failing the
    /// whole operation.
    pub async fn rate(&self, rate: Rate) -> BotResult<Decimal> {
        let default = rate.default_value();
        let raw = self
            .store
            .get_or_init(&rate.key(), &default.to_string())
            .await?;
        match rate.validate(&raw) {
            Ok(v) => Ok(v),
            Err(_) => {
                warn!(target = "pricing", key = %rate, value = %raw, "Stored rate is invalid; using default");
                Ok(default)
            }
        }
    }

    pub async fn set_rate(&self, rate: Rate, raw: &str) -> BotResult<Decimal> {
        let value = rate.validate(raw)?;
        self.store.set(&rate.key(), &value.to_string()).await?;
        tracing::info!(target = "pricing", key = %rate, value = %value, "Rate updated");
        Ok(value)
    }

    pub async fn for_tier(&self, tier: i32) -> BotResult<TierPolicy> {
        let tier = tier.clamp(0, MAX_TIER);
        Ok(TierPolicy {
            tier,
            transfer_limit: self.rate(Rate::TransferLimit(tier)).await?,
            discount: self.rate(Rate::Discount(tier)).await?,
            referral_reward: self.rate(Rate::ReferralReward(tier)).await?,
            click_reward: self.rate(Rate::ClickReward(tier)).await?,
        })
    }

    pub async fn status_cost(&self, tier: i32) -> BotResult<Decimal> {
        if !(1..=MAX_TIER).contains(&tier) {
            return Err(BotError::invalid(format!(
                "Choose a status tier between 1 and {MAX_TIER}."
            )));
        }
        self.rate(Rate::StatusCost(tier)).await
    }

    pub async fn status_duration(&self) -> BotResult<Duration> {
        let days = i64::try_from(self.rate(Rate::StatusDays).await?)
            .map_err(|_| BotError::Config("status_days is not a whole number".into()))?;
        Duration::try_days(days.clamp(1, MAX_STATUS_DAYS))
            .ok_or_else(|| BotError::Config(format!("status_days {days} is out of range")))
    }

    pub async fn clicker_cost(&self) -> BotResult<Decimal> {
        self.rate(Rate::ClickerCost).await
    }

    /// Current value of every rate, in key order of `Rate::all`.
    pub async fn snapshot(&self) -> BotResult<Vec<(Rate, Decimal)>> {
        let mut out = Vec::new();
        for rate in Rate::all() {
            out.push((rate, self.rate(rate).await?));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn discount_rounds_to_cents() {
        assert_eq!(final_price(dec!(12000), dec!(0.03)), dec!(11640.00));
        assert_eq!(final_price(dec!(0.99), dec!(0.05)), dec!(0.94));
        assert_eq!(final_price(dec!(100), Decimal::ONE), Decimal::ZERO);
    }

    #[test]
    fn rate_keys_round_trip_through_parse() {
        for rate in Rate::all() {
            assert_eq!(rate.key().parse::<Rate>(), Ok(rate));
        }
        assert!("status_cost.0".parse::<Rate>().is_err());
    }

    #[test]
    fn rate_validation_ranges() {
        assert!(Rate::Discount(1).validate("1.5").is_err());
        assert_eq!(Rate::Discount(1).validate("0.07").unwrap(), dec!(0.07));
        assert!(Rate::StatusDays.validate("2.5").is_err());
        assert!(Rate::TransferLimit(0).validate("-1").is_err());
        assert_eq!(Rate::TransferLimit(0).validate("30 000").unwrap(), dec!(30000));
    }

    #[test]
    fn money_rates_fit_the_ledger() {
        assert!(Rate::ClickReward(0).validate("0.005").is_err());
        assert!(Rate::ReferralReward(2).validate("0.001").is_err());
        assert_eq!(Rate::ClickReward(0).validate("0.50").unwrap(), dec!(0.5));
        assert!(Rate::ClickReward(0).validate("0").is_err());
        assert_eq!(Rate::ReferralReward(0).validate("0").unwrap(), Decimal::ZERO);
        assert!(matches!(
            Rate::ClickerCost.validate("1000000000000000000"),
            Err(BotError::InvalidAmount(_))
        ));
        // discounts keep their precision
        assert_eq!(Rate::Discount(2).validate("0.125").unwrap(), dec!(0.125));
    }

    #[test]
    fn status_days_are_capped() {
        assert_eq!(Rate::StatusDays.validate("3650").unwrap(), dec!(3650));
        assert!(Rate::StatusDays.validate("3651").is_err());
        assert!(Rate::StatusDays.validate("100000000").is_err());
        assert!(Rate::StatusDays.validate("0").is_err());
    }
}
