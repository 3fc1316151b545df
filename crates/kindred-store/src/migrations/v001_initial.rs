//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `accounts`, `friend_requests`,
//! `friend_links`, `reports`, and `chats`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Accounts
-- ----------------------------------------------------------------
-- A row is never physically removed once its account has been soft-deleted:
-- the username stays reserved forever.  `banned_until` is NULL when the
-- account is not inside a ban window.
CREATE TABLE IF NOT EXISTS accounts (
    id            TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    username      TEXT NOT NULL UNIQUE,
    display_name  TEXT NOT NULL,
    email         TEXT,
    password_hash TEXT NOT NULL,
    personality   TEXT,                       -- upper-cased matchmaking attribute
    avatar        TEXT,                       -- one of the fixed avatar tags
    is_vpn        INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    deleted       INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    banned_until  TEXT,                       -- ISO-8601 / RFC-3339, NULL = not banned
    ban_count     INTEGER NOT NULL DEFAULT 0,
    friend_count  INTEGER NOT NULL DEFAULT 0, -- derived cache over friend_links
    created_at    TEXT NOT NULL               -- ISO-8601 / RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_accounts_personality ON accounts(personality);

-- ----------------------------------------------------------------
-- Friend requests
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS friend_requests (
    id           TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    from_account TEXT NOT NULL,               -- FK -> accounts(id)
    to_account   TEXT NOT NULL,               -- FK -> accounts(id)
    status       TEXT NOT NULL DEFAULT 'pending',
    created_at   TEXT NOT NULL,

    FOREIGN KEY (from_account) REFERENCES accounts(id) ON DELETE CASCADE,
    FOREIGN KEY (to_account)   REFERENCES accounts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_friend_requests_to
    ON friend_requests(to_account, status);

-- ----------------------------------------------------------------
-- Friend links
-- ----------------------------------------------------------------
-- Symmetric: a pair appears once, in whichever order the accepting request
-- recorded it.  All queries match both orders.
CREATE TABLE IF NOT EXISTS friend_links (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    account_a  TEXT NOT NULL,                 -- FK -> accounts(id)
    account_b  TEXT NOT NULL,                 -- FK -> accounts(id)
    created_at TEXT NOT NULL,

    FOREIGN KEY (account_a) REFERENCES accounts(id) ON DELETE CASCADE,
    FOREIGN KEY (account_b) REFERENCES accounts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_friend_links_a ON friend_links(account_a);
CREATE INDEX IF NOT EXISTS idx_friend_links_b ON friend_links(account_b);

-- ----------------------------------------------------------------
-- Reports
-- ----------------------------------------------------------------
-- Dedup per (reporter, reported) and per (origin_addr, reported) is checked
-- inside the submission transaction before inserting, not by constraints.
CREATE TABLE IF NOT EXISTS reports (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    reporter    TEXT NOT NULL,                -- FK -> accounts(id)
    reported    TEXT NOT NULL,                -- FK -> accounts(id)
    origin_addr TEXT NOT NULL,                -- opaque network origin string
    created_at  TEXT NOT NULL,

    FOREIGN KEY (reporter) REFERENCES accounts(id) ON DELETE CASCADE,
    FOREIGN KEY (reported) REFERENCES accounts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_reports_reported ON reports(reported);

-- ----------------------------------------------------------------
-- Chats
-- ----------------------------------------------------------------
-- Direct-message history between two accounts.  Rows are owned by the
-- accounts they reference and are removed by the account-graph purge.
CREATE TABLE IF NOT EXISTS chats (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID v4
    account_a  TEXT NOT NULL,                 -- FK -> accounts(id)
    account_b  TEXT NOT NULL,                 -- FK -> accounts(id)
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (account_a) REFERENCES accounts(id) ON DELETE CASCADE,
    FOREIGN KEY (account_b) REFERENCES accounts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chats_a ON chats(account_a);
CREATE INDEX IF NOT EXISTS idx_chats_b ON chats(account_b);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
