//! Static shape of every multi-step flow: its ordered steps, the scratch field each step fills,
//! and the typed values the validators produce.

use crate::database::models::{AccountId, Media, PackageKind, Payload};
use crate::services::pricing::Rate;
use crate::services::theme::ThemeKey;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    PackagePurchase,
    TopUp,
    Transfer,
    Upgrade,
    AddGood,
    AddPackage,
    EditPackage,
    SetRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    GameId,
    TopUpAmount,
    Receipt,
    Recipient,
    TransferAmount,
    UpgradeChoice,
    UpgradeConfirm,
    GoodMedia,
    GoodName,
    GoodDescription,
    GoodPrice,
    GoodPayload,
    PackageKind,
    PackageTitle,
    PackageQuantity,
    PackagePrice,
    PackageAltPrice,
    PackageSelect,
    SettingKey,
    SettingValue,
}

impl FlowKind {
    pub const ALL: [FlowKind; 8] = [
        FlowKind::PackagePurchase,
        FlowKind::TopUp,
        FlowKind::Transfer,
        FlowKind::Upgrade,
        FlowKind::AddGood,
        FlowKind::AddPackage,
        FlowKind::EditPackage,
        FlowKind::SetRate,
    ];

    pub fn steps(&self) -> &'static [Step] {
        use Step::*;
        match self {
            FlowKind::PackagePurchase => &[GameId],
            FlowKind::TopUp => &[TopUpAmount, Receipt],
            FlowKind::Transfer => &[Recipient, TransferAmount],
            FlowKind::Upgrade => &[UpgradeChoice, UpgradeConfirm],
            FlowKind::AddGood => &[GoodMedia, GoodName, GoodDescription, GoodPrice, GoodPayload],
            FlowKind::AddPackage => &[
                PackageKind,
                PackageTitle,
                PackageQuantity,
                PackagePrice,
                PackageAltPrice,
            ],
            FlowKind::EditPackage => &[PackageSelect, PackagePrice, PackageAltPrice],
            FlowKind::SetRate => &[SettingKey, SettingValue],
        }
    }

    pub fn admin_only(&self) -> bool {
        matches!(
            self,
            FlowKind::AddGood | FlowKind::AddPackage | FlowKind::EditPackage | FlowKind::SetRate
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            FlowKind::PackagePurchase => "package purchase",
            FlowKind::TopUp => "top-up",
            FlowKind::Transfer => "transfer",
            FlowKind::Upgrade => "upgrade",
            FlowKind::AddGood => "add good",
            FlowKind::AddPackage => "add package",
            FlowKind::EditPackage => "edit package",
            FlowKind::SetRate => "set rate",
        }
    }
}

/// Keys of the per-flow scratch map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Owner,
    PackageId,
    PackageTitle,
    Price,
    Limit,
    GameId,
    Amount,
    Receipt,
    Recipient,
    Choice,
    Confirmed,
    Media,
    Name,
    Description,
    Payload,
    Kind,
    Title,
    Quantity,
    AltPrice,
    Setting,
    SettingValue,
}

impl Step {
    pub fn field(&self) -> Field {
        match self {
            Step::GameId => Field::GameId,
            Step::TopUpAmount | Step::TransferAmount => Field::Amount,
            Step::Receipt => Field::Receipt,
            Step::Recipient => Field::Recipient,
            Step::UpgradeChoice => Field::Choice,
            Step::UpgradeConfirm => Field::Confirmed,
            Step::GoodMedia => Field::Media,
            Step::GoodName => Field::Name,
            Step::GoodDescription => Field::Description,
            Step::GoodPrice | Step::PackagePrice => Field::Price,
            Step::GoodPayload => Field::Payload,
            Step::PackageKind => Field::Kind,
            Step::PackageTitle => Field::Title,
            Step::PackageQuantity => Field::Quantity,
            Step::PackageAltPrice => Field::AltPrice,
            Step::PackageSelect => Field::PackageId,
            Step::SettingKey => Field::Setting,
            Step::SettingValue => Field::SettingValue,
        }
    }
}

/// Raw user input as the conversation sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Text(String),
    Photo(String),
    Video(String),
    File(String),
}

/// Optional media step: a photo, a video, or an explicit skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaInput {
    Photo(String),
    Video(String),
    Skipped,
}

impl MediaInput {
    pub fn into_media(self) -> Option<Media> {
        match self {
            MediaInput::Photo(r) => Some(Media::Photo(r)),
            MediaInput::Video(r) => Some(Media::Video(r)),
            MediaInput::Skipped => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeChoice {
    Tier(i32),
    Clicker,
}

impl fmt::Display for UpgradeChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeChoice::Tier(t) => write!(f, "{} status", crate::services::theme::Theme::tier_name(*t)),
            UpgradeChoice::Clicker => f.write_str("the clicker"),
        }
    }
}

/// A config key the admin may change: a numeric rate or a display noun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Rate(Rate),
    Theme(ThemeKey),
}

impl Setting {
    pub fn key(&self) -> String {
        match self {
            Setting::Rate(r) => r.key(),
            Setting::Theme(k) => k.key().to_string(),
        }
    }
}

impl FromStr for Setting {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rate::from_str(s)
            .map(Setting::Rate)
            .or_else(|_| ThemeKey::from_str(s).map(Setting::Theme))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Id(i64),
    Money(Decimal),
    Text(String),
    Account(AccountId),
    Media(MediaInput),
    Payload(Payload),
    Choice(UpgradeChoice),
    Flag(bool),
    Kind(PackageKind),
    Setting(Setting),
}

/// Values collected so far in the active flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scratch(HashMap<Field, Value>);

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field, value: Value) -> Self {
        self.0.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: Field, value: Value) {
        self.0.insert(field, value);
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.0.get(&field)
    }

    pub fn id(&self, field: Field) -> Option<i64> {
        match self.get(field) {
            Some(Value::Id(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn money(&self, field: Field) -> Option<Decimal> {
        match self.get(field) {
            Some(Value::Money(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        match self.get(field) {
            Some(Value::Text(v)) => Some(v),
            _ => None,
        }
    }

    pub fn account(&self, field: Field) -> Option<AccountId> {
        match self.get(field) {
            Some(Value::Account(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn choice(&self) -> Option<UpgradeChoice> {
        match self.get(Field::Choice) {
            Some(Value::Choice(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn flag(&self, field: Field) -> Option<bool> {
        match self.get(field) {
            Some(Value::Flag(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn setting(&self) -> Option<Setting> {
        match self.get(Field::Setting) {
            Some(Value::Setting(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<PackageKind> {
        match self.get(Field::Kind) {
            Some(Value::Kind(v)) => Some(*v),
            _ => None,
        }
    }

    /// Take ownership of a media or payload value at completion.
    pub fn take(&mut self, field: Field) -> Option<Value> {
        self.0.remove(&field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_flow_has_steps_with_distinct_fields() {
        for kind in FlowKind::ALL {
            let steps = kind.steps();
            assert!(!steps.is_empty(), "{kind:?} has no steps");
            let fields: std::collections::HashSet<Field> =
                steps.iter().map(|s| s.field()).collect();
            assert_eq!(fields.len(), steps.len(), "{kind:?} reuses a field");
        }
    }

    #[test]
    fn setting_parses_rates_and_theme_keys() {
        assert_eq!(
            "discount.2".parse::<Setting>(),
            Ok(Setting::Rate(Rate::Discount(2)))
        );
        assert_eq!(
            "theme.goods_noun".parse::<Setting>(),
            Ok(Setting::Theme(ThemeKey::GoodsNoun))
        );
        assert!("nope".parse::<Setting>().is_err());
    }
}
