// Central constants for limits and defaults.
pub const HISTORY_LIMIT: i64 = 5; // ledger entries shown in the cabinet
// NUMERIC(20,2) money columns hold values below 10^18.
pub const AMOUNT_CEILING: i64 = 1_000_000_000_000_000_000;
// Status periods are capped at ten years.
pub const MAX_STATUS_DAYS: i64 = 3650;
pub const DEFAULT_PREFIX: &str = "!";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
// Discord allows 5 buttons per action row and 5 rows per message.
pub const MAX_CONTROLS_PER_ROW: usize = 5;
pub const MAX_CONTROL_ROWS: usize = 5;
