//! Postgres functions for the `bot_config` key/value table.

use crate::error::BotResult;
use sqlx::PgPool;

/// Reads a config value, inserting `default` when the key is missing. The no-op update on
/// conflict makes the existing row come back from `RETURNING`, so concurrent first reads all get
/// a row and agree on it.
pub async fn get_or_init_config_value(pool: &PgPool, key: &str, default: &str) -> BotResult<String> {
    let value: String = sqlx::query_scalar(
        "INSERT INTO bot_config (key, value) VALUES ($1, $2) ON CONFLICT (key) DO UPDATE SET key = EXCLUDED.key RETURNING value",
    )
    .bind(key)
    .bind(default)
    .fetch_one(pool)
    .await?;
    Ok(value)
}

pub async fn set_config_value(pool: &PgPool, key: &str, value: &str) -> BotResult<()> {
    sqlx::query("INSERT INTO bot_config (key, value) VALUES ($1, $2) ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value")
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    Ok(())
}
