//! Error taxonomy shared by the ledger, catalog, conversation and moderation layers.
//!
//! Every failure a chat event can run into maps to one `BotError` variant. Recoverable variants
//! are rendered back to the user; `Persistence` is fatal for the in-flight operation and is shown
//! as a generic failure.

use rust_decimal::Decimal;
use thiserror::Error;

pub type BotResult<T> = Result<T, BotError>;

#[derive(Debug, Error)]
pub enum BotError {
    /// Malformed user input. The current step re-prompts.
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("invalid amount {0}")]
    InvalidAmount(Decimal),

    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Decimal, required: Decimal },

    #[error("transfer limit exceeded: limit {limit}, requested {requested}")]
    LimitExceeded { limit: Decimal, requested: Decimal },

    #[error("moderation request #{0} was already resolved")]
    AlreadyResolved(i64),

    #[error("{0} not found")]
    NotFound(String),

    #[error("this action is restricted to the admin")]
    Forbidden,

    #[error("malformed action token: {0}")]
    MalformedToken(String),

    /// Outbound message could not be delivered (blocked DM, deleted user...).
    #[error("notification delivery failed: {0}")]
    NotificationDelivery(String),

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for BotError {
    fn from(e: sqlx::Error) -> Self {
        BotError::Persistence(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for BotError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        BotError::Persistence(e.to_string())
    }
}

impl BotError {
    pub fn not_found(what: impl Into<String>) -> Self {
        BotError::NotFound(what.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        BotError::Validation(msg.into())
    }

    /// Whether the user can continue after this error (re-prompt or inform) as opposed to a
    /// failure of the backing store or process configuration.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, BotError::Persistence(_) | BotError::Config(_))
    }

    /// Text shown to the chat user. Store internals never leak into it.
    pub fn user_message(&self, currency: &str) -> String {
        match self {
            BotError::Validation(msg) => format!("⚠️ {msg}"),
            BotError::InvalidAmount(_) => {
                "⚠️ The amount must be greater than zero and small enough to store.".to_string()
            }
            BotError::InsufficientFunds { balance, required } => format!(
                "❌ Insufficient funds. You need {required} {currency} but your balance is {balance} {currency}."
            ),
            BotError::LimitExceeded { limit, .. } => format!(
                "❌ That exceeds your transfer limit of {limit} {currency}."
            ),
            BotError::AlreadyResolved(id) => format!("ℹ️ Request #{id} has already been handled."),
            BotError::NotFound(what) => format!("❌ {what} no longer exists."),
            BotError::Forbidden => "⛔ You are not the admin.".to_string(),
            BotError::MalformedToken(_) => "⚠️ This control is no longer valid.".to_string(),
            BotError::NotificationDelivery(_)
            | BotError::Persistence(_)
            | BotError::Config(_) => "❌ Something went wrong. Please try again later.".to_string(),
        }
    }
}
