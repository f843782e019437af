//! Process settings read from the environment (a `.env` file is loaded first by `main`).

use crate::constants::{
    DEFAULT_DB_MAX_CONNECTIONS, DEFAULT_PREFIX, DEFAULT_SESSION_IDLE_SECS,
    DEFAULT_SWEEP_INTERVAL_SECS,
};
use crate::database::models::AccountId;
use crate::error::{BotError, BotResult};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub discord_token: String,
    pub admin_id: AccountId,
    /// Without a database URL the bot runs on the in-memory store.
    pub database_url: Option<String>,
    pub command_prefix: String,
    pub db_max_connections: u32,
    pub session_idle: Duration,
    pub sweep_interval: Duration,
}

impl Settings {
    pub fn from_env() -> BotResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> BotResult<Self> {
        let required = |key: &str| {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| BotError::Config(format!("{key} must be set")))
        };
        let number = |key: &str, default: u64| -> BotResult<u64> {
            match get(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| BotError::Config(format!("{key} must be a number, got '{raw}'"))),
                None => Ok(default),
            }
        };

        let admin_raw = required("ADMIN_ID")?;
        let admin_id = AccountId::from_str(&admin_raw)
            .map_err(|_| BotError::Config(format!("ADMIN_ID must be a user id, got '{admin_raw}'")))?;
        let db_max_connections = u32::try_from(number(
            "DB_MAX_CONNECTIONS",
            u64::from(DEFAULT_DB_MAX_CONNECTIONS),
        )?)
        .map_err(|_| BotError::Config("DB_MAX_CONNECTIONS is out of range".into()))?;
        let session_idle = number("SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE_SECS)?;
        let sweep_interval = number("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?.max(1);

        Ok(Self {
            discord_token: required("DISCORD_TOKEN")?,
            admin_id,
            database_url: get("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            command_prefix: get("COMMAND_PREFIX")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            db_max_connections,
            session_idle: Duration::from_secs(session_idle),
            sweep_interval: Duration::from_secs(sweep_interval),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply() {
        let s = Settings::from_lookup(lookup(&[("DISCORD_TOKEN", "t"), ("ADMIN_ID", "42")])).unwrap();
        assert_eq!(s.admin_id, AccountId(42));
        assert_eq!(s.command_prefix, "!");
        assert!(s.database_url.is_none());
        assert_eq!(s.session_idle, Duration::from_secs(1800));
    }

    #[test]
    fn bad_admin_id_is_a_config_error() {
        let err = Settings::from_lookup(lookup(&[("DISCORD_TOKEN", "t"), ("ADMIN_ID", "zero")]))
            .unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
        assert!(Settings::from_lookup(lookup(&[("ADMIN_ID", "1")])).is_err());
    }
}
