//! Row-level operations for [`FriendRequest`] and [`FriendLink`] records.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use kindred_shared::{Avatar, RequestStatus};

use crate::database::Database;
use crate::error::Result;
use crate::models::{FriendLink, FriendRequest, PendingRequestView};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Insert a new friend request.
pub fn insert_request(conn: &Connection, request: &FriendRequest) -> Result<()> {
    conn.execute(
        "INSERT INTO friend_requests (id, from_account, to_account, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            request.id.to_string(),
            request.from_account.to_string(),
            request.to_account.to_string(),
            request.status.as_str(),
            request.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Whether a *pending* request already exists for the exact ordered pair.
/// The reverse direction is tracked independently.
pub fn pending_request_exists(conn: &Connection, from: Uuid, to: Uuid) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM friend_requests
             WHERE from_account = ?1 AND to_account = ?2 AND status = 'pending'",
            params![from.to_string(), to.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Fetch a single request by id.
pub fn get_request(conn: &Connection, id: Uuid) -> Result<Option<FriendRequest>> {
    conn.query_row(
        "SELECT id, from_account, to_account, status, created_at
         FROM friend_requests WHERE id = ?1",
        params![id.to_string()],
        row_to_request,
    )
    .optional()
    .map_err(Into::into)
}

/// Move a request to a (terminal) status.
pub fn set_request_status(conn: &Connection, id: Uuid, status: RequestStatus) -> Result<()> {
    conn.execute(
        "UPDATE friend_requests SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    )?;
    Ok(())
}

/// Pending requests addressed to an account, joined with the sender's
/// public profile, oldest first.
pub fn list_incoming_pending(conn: &Connection, to: Uuid) -> Result<Vec<PendingRequestView>> {
    let mut stmt = conn.prepare(
        "SELECT fr.id, fr.from_account, a.username, a.display_name, a.avatar
         FROM friend_requests fr
         JOIN accounts a ON a.id = fr.from_account
         WHERE fr.to_account = ?1 AND fr.status = 'pending'
         ORDER BY fr.created_at ASC",
    )?;

    let rows = stmt.query_map(params![to.to_string()], |row| {
        let id_str: String = row.get(0)?;
        let from_str: String = row.get(1)?;
        let from_username: String = row.get(2)?;
        let display_name: String = row.get(3)?;
        let avatar_str: Option<String> = row.get(4)?;

        let id = Uuid::parse_str(&id_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        let from_account = Uuid::parse_str(&from_str).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(PendingRequestView {
            id,
            from_account,
            from_username,
            display_name,
            avatar: avatar_str.as_deref().and_then(Avatar::parse),
        })
    })?;

    let mut views = Vec::new();
    for row in rows {
        views.push(row?);
    }
    Ok(views)
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Insert a friendship link.
pub fn insert_link(conn: &Connection, link: &FriendLink) -> Result<()> {
    conn.execute(
        "INSERT INTO friend_links (id, account_a, account_b, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            link.id.to_string(),
            link.account_a.to_string(),
            link.account_b.to_string(),
            link.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Delete any link between the pair, in either stored order.  Returns the
/// number of rows removed.
pub fn delete_links_between(conn: &Connection, a: Uuid, b: Uuid) -> Result<usize> {
    let affected = conn.execute(
        "DELETE FROM friend_links
         WHERE (account_a = ?1 AND account_b = ?2)
            OR (account_a = ?2 AND account_b = ?1)",
        params![a.to_string(), b.to_string()],
    )?;
    Ok(affected)
}

/// Re-derive an account's cached friend count from the current link set and
/// persist it.  Must run inside the same transaction as the mutation that
/// changed the link set.
pub fn recompute_friend_count(conn: &Connection, id: Uuid) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM friend_links WHERE account_a = ?1 OR account_b = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    conn.execute(
        "UPDATE accounts SET friend_count = ?1 WHERE id = ?2",
        params![count, id.to_string()],
    )?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Database wrappers
// ---------------------------------------------------------------------------

impl Database {
    /// Pending requests addressed to an account (see [`list_incoming_pending`]).
    pub fn incoming_requests(&self, to: Uuid) -> Result<Vec<PendingRequestView>> {
        list_incoming_pending(self.conn(), to)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_request(row: &rusqlite::Row<'_>) -> rusqlite::Result<FriendRequest> {
    let id_str: String = row.get(0)?;
    let from_str: String = row.get(1)?;
    let to_str: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let from_account = Uuid::parse_str(&from_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let to_account = Uuid::parse_str(&to_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let status = RequestStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("unknown request status: {status_str}").into(),
        )
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(FriendRequest {
        id,
        from_account,
        to_account,
        status,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::insert_account;
    use crate::testutil::{sample_account, sample_link, sample_request, test_db};

    #[test]
    fn request_round_trip_and_pending_check() {
        let (_dir, db) = test_db();
        let alice = sample_account("alice", "INTJ");
        let bob = sample_account("bob", "ENFP");
        insert_account(db.conn(), &alice).unwrap();
        insert_account(db.conn(), &bob).unwrap();

        let request = sample_request(alice.id, bob.id);
        insert_request(db.conn(), &request).unwrap();

        assert!(pending_request_exists(db.conn(), alice.id, bob.id).unwrap());
        // Reverse direction is independent.
        assert!(!pending_request_exists(db.conn(), bob.id, alice.id).unwrap());

        let fetched = get_request(db.conn(), request.id).unwrap().unwrap();
        assert_eq!(fetched, request);
    }

    #[test]
    fn resolved_request_is_no_longer_pending() {
        let (_dir, db) = test_db();
        let alice = sample_account("alice", "INTJ");
        let bob = sample_account("bob", "ENFP");
        insert_account(db.conn(), &alice).unwrap();
        insert_account(db.conn(), &bob).unwrap();

        let request = sample_request(alice.id, bob.id);
        insert_request(db.conn(), &request).unwrap();
        set_request_status(db.conn(), request.id, RequestStatus::Rejected).unwrap();

        assert!(!pending_request_exists(db.conn(), alice.id, bob.id).unwrap());
        let fetched = get_request(db.conn(), request.id).unwrap().unwrap();
        assert_eq!(fetched.status, RequestStatus::Rejected);
    }

    #[test]
    fn incoming_listing_joins_sender_profile() {
        let (_dir, db) = test_db();
        let alice = sample_account("alice", "INTJ");
        let bob = sample_account("bob", "ENFP");
        insert_account(db.conn(), &alice).unwrap();
        insert_account(db.conn(), &bob).unwrap();

        insert_request(db.conn(), &sample_request(alice.id, bob.id)).unwrap();

        let incoming = db.incoming_requests(bob.id).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].from_account, alice.id);
        assert_eq!(incoming[0].from_username, "alice");

        assert!(db.incoming_requests(alice.id).unwrap().is_empty());
    }

    #[test]
    fn link_deletion_is_order_independent() {
        let (_dir, db) = test_db();
        let alice = sample_account("alice", "INTJ");
        let bob = sample_account("bob", "ENFP");
        insert_account(db.conn(), &alice).unwrap();
        insert_account(db.conn(), &bob).unwrap();

        insert_link(db.conn(), &sample_link(alice.id, bob.id)).unwrap();
        assert_eq!(recompute_friend_count(db.conn(), alice.id).unwrap(), 1);

        // Deleting with the endpoints swapped still removes the link.
        assert_eq!(delete_links_between(db.conn(), bob.id, alice.id).unwrap(), 1);
        assert_eq!(recompute_friend_count(db.conn(), alice.id).unwrap(), 0);
        assert_eq!(recompute_friend_count(db.conn(), bob.id).unwrap(), 0);
    }

    #[test]
    fn friend_count_matches_link_cardinality() {
        let (_dir, db) = test_db();
        let alice = sample_account("alice", "INTJ");
        let bob = sample_account("bob", "ENFP");
        let carol = sample_account("carol", "ISFP");
        for a in [&alice, &bob, &carol] {
            insert_account(db.conn(), a).unwrap();
        }

        insert_link(db.conn(), &sample_link(alice.id, bob.id)).unwrap();
        insert_link(db.conn(), &sample_link(carol.id, alice.id)).unwrap();

        assert_eq!(recompute_friend_count(db.conn(), alice.id).unwrap(), 2);
        assert_eq!(recompute_friend_count(db.conn(), bob.id).unwrap(), 1);

        let fetched = db.get_account(alice.id).unwrap().unwrap();
        assert_eq!(fetched.friend_count, 2);
    }
}
