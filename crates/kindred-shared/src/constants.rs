/// Application name
pub const APP_NAME: &str = "Kindred";

/// Distinct origin addresses that must have reported an account before the
/// moderation engine escalates.
pub const REPORT_ORIGIN_THRESHOLD: u32 = 3;

/// Escalation count at which an account is permanently removed instead of
/// re-banned.
pub const BAN_COUNT_CEILING: u32 = 3;

/// Length of a temporary ban window, in hours.
pub const BAN_WINDOW_HOURS: i64 = 10;

/// Display name left on a removed account.
pub const DELETED_DISPLAY_NAME: &str = "[deleted]";

/// Session token lifetime, in days.
pub const SESSION_TTL_DAYS: i64 = 7;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 4000;
