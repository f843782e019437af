//! Pure per-step validators. Each takes the raw input and the scratch collected so far and
//! returns the typed value to store, or a `Validation` error whose text is shown to the user.

use super::flow::{Field, Input, MediaInput, Scratch, Setting, Step, UpgradeChoice, Value};
use crate::constants::AMOUNT_CEILING;
use crate::database::models::{AccountId, PackageKind, Payload};
use crate::error::{BotError, BotResult};
use crate::services::pricing::MAX_TIER;
use rust_decimal::Decimal;
use std::str::FromStr;

const MAX_NAME_CHARS: usize = 100;
const MAX_DESCRIPTION_CHARS: usize = 1000;
const MAX_TITLE_CHARS: usize = 64;
const MAX_GAME_ID_DIGITS: usize = 20;

pub fn validate(step: Step, input: &Input, scratch: &Scratch) -> BotResult<Value> {
    match step {
        Step::GameId => {
            let raw = text(input, "Please send your in-game player ID as text.")?;
            if raw.is_empty()
                || raw.len() > MAX_GAME_ID_DIGITS
                || !raw.chars().all(|c| c.is_ascii_digit())
            {
                return Err(BotError::invalid("The player ID must contain digits only."));
            }
            Ok(Value::Text(raw.to_string()))
        }
        Step::TopUpAmount => {
            let amount = money(text(input, "Please send the amount as a number.")?)?;
            if amount <= Decimal::ZERO {
                return Err(BotError::invalid("The amount must be greater than zero."));
            }
            Ok(Value::Money(amount))
        }
        Step::Receipt => match input {
            Input::Photo(r) => Ok(Value::Media(MediaInput::Photo(r.clone()))),
            _ => Err(BotError::invalid("Please send the payment receipt as a photo.")),
        },
        Step::Recipient => {
            let raw = text(input, "Please send the recipient's account id.")?;
            let id = AccountId::from_str(raw)
                .map_err(|_| BotError::invalid("An account id is a positive number."))?;
            if scratch.account(Field::Owner) == Some(id) {
                return Err(BotError::invalid("You cannot transfer to yourself."));
            }
            Ok(Value::Account(id))
        }
        Step::TransferAmount => {
            let amount = money(text(input, "Please send the amount as a number.")?)?;
            if amount <= Decimal::ZERO {
                return Err(BotError::InvalidAmount(amount));
            }
            if let Some(limit) = scratch.money(Field::Limit) {
                if amount > limit {
                    return Err(BotError::LimitExceeded {
                        limit,
                        requested: amount,
                    });
                }
            }
            Ok(Value::Money(amount))
        }
        Step::UpgradeChoice => {
            let raw = text(input, "Reply with a tier number or `clicker`.")?;
            if raw.eq_ignore_ascii_case("clicker") {
                return Ok(Value::Choice(UpgradeChoice::Clicker));
            }
            match raw.parse::<i32>() {
                Ok(t) if (1..=MAX_TIER).contains(&t) => Ok(Value::Choice(UpgradeChoice::Tier(t))),
                _ => Err(BotError::invalid(format!(
                    "Reply with a tier number from 1 to {MAX_TIER}, or `clicker`."
                ))),
            }
        }
        Step::UpgradeConfirm => {
            let raw = text(input, "Reply `yes` or `no`.")?.to_lowercase();
            match raw.as_str() {
                "yes" | "y" => Ok(Value::Flag(true)),
                "no" | "n" => Ok(Value::Flag(false)),
                _ => Err(BotError::invalid("Reply `yes` or `no`.")),
            }
        }
        Step::GoodMedia => match input {
            Input::Photo(r) => Ok(Value::Media(MediaInput::Photo(r.clone()))),
            Input::Video(r) => Ok(Value::Media(MediaInput::Video(r.clone()))),
            Input::Text(t) if t.trim().eq_ignore_ascii_case("skip") => {
                Ok(Value::Media(MediaInput::Skipped))
            }
            _ => Err(BotError::invalid("Send a photo or a video, or type `skip`.")),
        },
        Step::GoodName => bounded_text(input, MAX_NAME_CHARS),
        Step::GoodDescription => bounded_text(input, MAX_DESCRIPTION_CHARS),
        Step::PackageTitle => bounded_text(input, MAX_TITLE_CHARS),
        Step::GoodPrice | Step::PackagePrice | Step::PackageAltPrice => {
            let price = money(text(input, "Please send the price as a number.")?)?;
            Ok(Value::Money(price))
        }
        Step::GoodPayload => match input {
            Input::Text(t) if !t.trim().is_empty() => Ok(Value::Payload(Payload::Text(t.trim().to_string()))),
            Input::File(r) | Input::Photo(r) | Input::Video(r) => {
                Ok(Value::Payload(Payload::File(r.clone())))
            }
            _ => Err(BotError::invalid("Send the deliverable as text or as a file.")),
        },
        Step::PackageKind => {
            let raw = text(input, "Reply `uc` or `pop`.")?;
            PackageKind::from_str(raw)
                .map(Value::Kind)
                .map_err(|_| BotError::invalid("Reply `uc` or `pop`."))
        }
        Step::PackageQuantity => {
            let raw = text(input, "Please send the quantity as a whole number.")?;
            match raw.parse::<i64>() {
                Ok(q) if q > 0 => Ok(Value::Id(q)),
                _ => Err(BotError::invalid("The quantity must be a whole number above zero.")),
            }
        }
        Step::PackageSelect => {
            let raw = text(input, "Please send the package id.")?;
            match raw.trim_start_matches('#').parse::<i64>() {
                Ok(id) if id > 0 => Ok(Value::Id(id)),
                _ => Err(BotError::invalid("A package id is a positive number.")),
            }
        }
        Step::SettingKey => {
            let raw = text(input, "Please send a setting key.")?;
            Setting::from_str(raw)
                .map(Value::Setting)
                .map_err(|_| BotError::invalid(format!("Unknown setting `{raw}`.")))
        }
        Step::SettingValue => {
            let raw = text(input, "Please send the new value as text.")?;
            let normalized = match scratch.setting() {
                Some(Setting::Rate(rate)) => rate.validate(raw)?.to_string(),
                Some(Setting::Theme(key)) => key.validate(raw)?,
                None => return Err(BotError::invalid("Choose a setting first.")),
            };
            Ok(Value::Text(normalized))
        }
    }
}

fn text<'a>(input: &'a Input, expected: &str) -> BotResult<&'a str> {
    match input {
        Input::Text(t) => Ok(t.trim()),
        _ => Err(BotError::invalid(expected)),
    }
}

fn bounded_text(input: &Input, max_chars: usize) -> BotResult<Value> {
    let raw = text(input, "Please send text.")?;
    if raw.is_empty() {
        return Err(BotError::invalid("This cannot be empty."));
    }
    if raw.chars().count() > max_chars {
        return Err(BotError::invalid(format!(
            "Keep it under {max_chars} characters."
        )));
    }
    Ok(Value::Text(raw.to_string()))
}

/// Non-negative amount with at most two decimal places, below the storage ceiling. Spaces and
/// underscores are accepted as thousands separators.
pub fn money(raw: &str) -> BotResult<Decimal> {
    let cleaned: String = raw.chars().filter(|c| *c != ' ' && *c != '_').collect();
    let value = Decimal::from_str(&cleaned)
        .map_err(|_| BotError::invalid("Please send a number, e.g. 15000."))?;
    if value < Decimal::ZERO {
        return Err(BotError::invalid("The amount cannot be negative."));
    }
    if value.normalize().scale() > 2 {
        return Err(BotError::invalid("Use at most two decimal places."));
    }
    if value >= Decimal::from(AMOUNT_CEILING) {
        return Err(BotError::InvalidAmount(value));
    }
    Ok(value)
}
