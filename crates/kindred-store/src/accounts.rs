//! Row-level operations for [`Account`] records.
//!
//! Mutation helpers take a plain [`rusqlite::Connection`] so the core crate
//! can compose them inside a single transaction (a `rusqlite::Transaction`
//! derefs to `Connection`).  The `Database` methods wrap the read paths for
//! standalone use.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use kindred_shared::constants::DELETED_DISPLAY_NAME;
use kindred_shared::Avatar;

use crate::database::Database;
use crate::error::Result;
use crate::models::Account;

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Insert a new account row.
pub fn insert_account(conn: &Connection, account: &Account) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts (id, username, display_name, email, password_hash,
                               personality, avatar, is_vpn, deleted, banned_until,
                               ban_count, friend_count, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            account.id.to_string(),
            account.username,
            account.display_name,
            account.email,
            account.password_hash,
            account.personality,
            account.avatar.map(|a| a.as_str()),
            account.is_vpn,
            account.deleted,
            account.banned_until.map(|t| t.to_rfc3339()),
            account.ban_count,
            account.friend_count,
            account.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

const ACCOUNT_COLUMNS: &str = "id, username, display_name, email, password_hash,
     personality, avatar, is_vpn, deleted, banned_until, ban_count, friend_count,
     created_at";

/// Fetch an account by id, whatever its lifecycle state.
pub fn get_account(conn: &Connection, id: Uuid) -> Result<Option<Account>> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
        params![id.to_string()],
        row_to_account,
    )
    .optional()
    .map_err(Into::into)
}

/// Fetch an account by username, whatever its lifecycle state.
///
/// Deleted rows are returned too: registration needs to see them to enforce
/// username reservation.
pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<Account>> {
    conn.query_row(
        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = ?1"),
        params![username],
        row_to_account,
    )
    .optional()
    .map_err(Into::into)
}

/// All accounts eligible for a matchmaking pick on the given attribute,
/// excluding the requester and deleted accounts.  The ban window is a
/// read-time predicate, so the caller filters it against its own clock.
pub fn list_match_candidates(
    conn: &Connection,
    personality: &str,
    excluding: Uuid,
) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts
         WHERE personality = ?1 AND id != ?2 AND deleted = 0"
    ))?;

    let rows = stmt.query_map(params![personality, excluding.to_string()], row_to_account)?;

    let mut accounts = Vec::new();
    for row in rows {
        accounts.push(row?);
    }
    Ok(accounts)
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// Set or clear the matchmaking attribute.  Returns `false` if no row matched.
pub fn set_personality(conn: &Connection, id: Uuid, personality: Option<&str>) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE accounts SET personality = ?1 WHERE id = ?2",
        params![personality, id.to_string()],
    )?;
    Ok(affected > 0)
}

/// Flag or unflag an account as connecting through an anonymizing network.
pub fn set_vpn_flag(conn: &Connection, id: Uuid, is_vpn: bool) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE accounts SET is_vpn = ?1 WHERE id = ?2",
        params![is_vpn, id.to_string()],
    )?;
    Ok(affected > 0)
}

/// Apply a ban window and persist the escalation counter in one statement.
pub fn apply_ban(
    conn: &Connection,
    id: Uuid,
    until: DateTime<Utc>,
    ban_count: u32,
) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET banned_until = ?1, ban_count = ?2 WHERE id = ?3",
        params![until.to_rfc3339(), ban_count, id.to_string()],
    )?;
    Ok(())
}

/// Flip an account to its terminal deleted state.
///
/// PII fields are cleared irreversibly, the friend count is zeroed and any
/// ban window is dropped (deletion supersedes banning).  When the deletion
/// comes from the moderation engine the final `ban_count` is persisted
/// alongside; self-deletion leaves the counter as it was.
pub fn mark_deleted(conn: &Connection, id: Uuid, ban_count: Option<u32>) -> Result<()> {
    match ban_count {
        Some(count) => conn.execute(
            "UPDATE accounts
             SET deleted = 1, display_name = ?1, email = NULL, personality = NULL,
                 avatar = NULL, friend_count = 0, banned_until = NULL, ban_count = ?2
             WHERE id = ?3",
            params![DELETED_DISPLAY_NAME, count, id.to_string()],
        )?,
        None => conn.execute(
            "UPDATE accounts
             SET deleted = 1, display_name = ?1, email = NULL, personality = NULL,
                 avatar = NULL, friend_count = 0, banned_until = NULL
             WHERE id = ?2",
            params![DELETED_DISPLAY_NAME, id.to_string()],
        )?,
    };
    Ok(())
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Physically remove an account row.
///
/// Only the replace-on-reregistration path uses this; moderation and
/// self-deletion keep the row to reserve the username.
pub fn delete_account_row(conn: &Connection, id: Uuid) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM accounts WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(affected > 0)
}

// ---------------------------------------------------------------------------
// Database wrappers
// ---------------------------------------------------------------------------

impl Database {
    /// Fetch an account by id.
    pub fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        get_account(self.conn(), id)
    }

    /// Fetch an account by username (deleted rows included).
    pub fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        find_by_username(self.conn(), username)
    }

    /// Set or clear the matchmaking attribute.
    pub fn set_personality(&self, id: Uuid, personality: Option<&str>) -> Result<bool> {
        set_personality(self.conn(), id, personality)
    }

    /// Matchmaking candidates for the given attribute (see
    /// [`list_match_candidates`]).
    pub fn list_match_candidates(&self, personality: &str, excluding: Uuid) -> Result<Vec<Account>> {
        list_match_candidates(self.conn(), personality, excluding)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to an [`Account`].
fn row_to_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<Account> {
    let id_str: String = row.get(0)?;
    let username: String = row.get(1)?;
    let display_name: String = row.get(2)?;
    let email: Option<String> = row.get(3)?;
    let password_hash: String = row.get(4)?;
    let personality: Option<String> = row.get(5)?;
    let avatar_str: Option<String> = row.get(6)?;
    let is_vpn: bool = row.get(7)?;
    let deleted: bool = row.get(8)?;
    let banned_str: Option<String> = row.get(9)?;
    let ban_count: u32 = row.get(10)?;
    let friend_count: u32 = row.get(11)?;
    let created_str: String = row.get(12)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let avatar = avatar_str.as_deref().and_then(Avatar::parse);

    let banned_until = banned_str
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        9,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })
        })
        .transpose()?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(12, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Account {
        id,
        username,
        display_name,
        email,
        password_hash,
        personality,
        avatar,
        is_vpn,
        deleted,
        banned_until,
        ban_count,
        friend_count,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{sample_account, test_db};
    use chrono::Duration;

    #[test]
    fn insert_and_fetch_round_trip() {
        let (_dir, db) = test_db();
        let account = sample_account("alice", "INTJ");
        insert_account(db.conn(), &account).unwrap();

        let fetched = db.get_account(account.id).unwrap().unwrap();
        assert_eq!(fetched, account);

        let by_name = db.find_account_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, account.id);

        assert!(db.find_account_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn username_is_unique() {
        let (_dir, db) = test_db();
        insert_account(db.conn(), &sample_account("alice", "INTJ")).unwrap();
        let dup = sample_account("alice", "ENFP");
        assert!(insert_account(db.conn(), &dup).is_err());
    }

    #[test]
    fn ban_window_round_trip() {
        let (_dir, db) = test_db();
        let account = sample_account("alice", "INTJ");
        insert_account(db.conn(), &account).unwrap();

        let now = Utc::now();
        let until = now + Duration::hours(10);
        apply_ban(db.conn(), account.id, until, 1).unwrap();

        let fetched = db.get_account(account.id).unwrap().unwrap();
        assert_eq!(fetched.ban_count, 1);
        assert!(fetched.is_banned(now));
        assert!(!fetched.is_banned(until + Duration::seconds(1)));
    }

    #[test]
    fn mark_deleted_clears_pii_and_ban_window() {
        let (_dir, db) = test_db();
        let mut account = sample_account("alice", "INTJ");
        account.email = Some("alice@example.com".into());
        insert_account(db.conn(), &account).unwrap();
        apply_ban(db.conn(), account.id, Utc::now() + Duration::hours(10), 2).unwrap();

        mark_deleted(db.conn(), account.id, Some(3)).unwrap();

        let fetched = db.get_account(account.id).unwrap().unwrap();
        assert!(fetched.deleted);
        assert_eq!(fetched.display_name, DELETED_DISPLAY_NAME);
        assert_eq!(fetched.email, None);
        assert_eq!(fetched.personality, None);
        assert_eq!(fetched.avatar, None);
        assert_eq!(fetched.friend_count, 0);
        assert_eq!(fetched.banned_until, None);
        assert_eq!(fetched.ban_count, 3);
        // Username survives deletion.
        assert_eq!(fetched.username, "alice");
    }

    #[test]
    fn match_candidates_exclude_requester_and_deleted() {
        let (_dir, db) = test_db();
        let alice = sample_account("alice", "INTJ");
        let bob = sample_account("bob", "INTJ");
        let carol = sample_account("carol", "ENFP");
        let dave = sample_account("dave", "INTJ");
        for a in [&alice, &bob, &carol, &dave] {
            insert_account(db.conn(), a).unwrap();
        }
        mark_deleted(db.conn(), dave.id, None).unwrap();

        let candidates = db.list_match_candidates("INTJ", alice.id).unwrap();
        let ids: Vec<_> = candidates.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![bob.id]);
    }
}
