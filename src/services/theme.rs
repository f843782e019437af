//! Display nouns and money formatting.
//!
//! Messages are built from templates that take these values as parameters; the nouns are
//! config values so the storefront can be re-themed without touching any message text.

use crate::database::ConfigStore;
use crate::error::{BotError, BotResult};
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeKey {
    Currency,
    AltCurrency,
    PackageNoun,
    GoodsNoun,
}

impl ThemeKey {
    pub const ALL: [ThemeKey; 4] = [
        ThemeKey::Currency,
        ThemeKey::AltCurrency,
        ThemeKey::PackageNoun,
        ThemeKey::GoodsNoun,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ThemeKey::Currency => "theme.currency",
            ThemeKey::AltCurrency => "theme.alt_currency",
            ThemeKey::PackageNoun => "theme.package_noun",
            ThemeKey::GoodsNoun => "theme.goods_noun",
        }
    }

    pub fn default_value(&self) -> &'static str {
        match self {
            ThemeKey::Currency => "so'm",
            ThemeKey::AltCurrency => "USD",
            ThemeKey::PackageNoun => "UC",
            ThemeKey::GoodsNoun => "game account",
        }
    }

    /// Theme values are short display words.
    pub fn validate(&self, raw: &str) -> BotResult<String> {
        let v = raw.trim();
        if v.is_empty() || v.chars().count() > 32 {
            return Err(BotError::invalid("Send a non-empty value of at most 32 characters."));
        }
        Ok(v.to_string())
    }
}

impl FromStr for ThemeKey {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ThemeKey::ALL
            .into_iter()
            .find(|k| k.key().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub currency: String,
    pub alt_currency: String,
    pub package_noun: String,
    pub goods_noun: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            currency: ThemeKey::Currency.default_value().to_string(),
            alt_currency: ThemeKey::AltCurrency.default_value().to_string(),
            package_noun: ThemeKey::PackageNoun.default_value().to_string(),
            goods_noun: ThemeKey::GoodsNoun.default_value().to_string(),
        }
    }
}

impl Theme {
    pub async fn load<S: ConfigStore + ?Sized>(store: &S) -> BotResult<Self> {
        let mut values = Vec::with_capacity(ThemeKey::ALL.len());
        for key in ThemeKey::ALL {
            values.push(store.get_or_init(key.key(), key.default_value()).await?);
        }
        let mut it = values.into_iter();
        let mut next = || it.next().unwrap_or_default();
        Ok(Self {
            currency: next(),
            alt_currency: next(),
            package_noun: next(),
            goods_noun: next(),
        })
    }

    pub fn money(&self, amount: Decimal) -> String {
        format!("{} {}", amount.normalize(), self.currency)
    }

    pub fn alt_money(&self, amount: Decimal) -> String {
        format!("{} {}", amount.round_dp(2).normalize(), self.alt_currency)
    }

    pub fn tier_name(tier: i32) -> &'static str {
        match tier {
            0 => "Standard",
            1 => "Silver",
            2 => "Gold",
            _ => "Platinum",
        }
    }
}
