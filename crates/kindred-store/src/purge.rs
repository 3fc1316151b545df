//! Cascading removal of everything an account owns in the social graph.
//!
//! One idempotent operation shared by the three call sites that take an
//! account out of the graph: replace-on-reregistration, self-deletion, and
//! escalated moderation.  Runs inside the caller's transaction.

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::friends::recompute_friend_count;

/// Hard-delete every friend link, friend request, report and chat row that
/// references the account, then refresh the cached friend count of every
/// former friend from the surviving link set.
///
/// The account row itself is untouched; callers decide between soft-delete
/// and physical removal.
pub fn purge_account_graph(conn: &Connection, id: Uuid) -> Result<()> {
    let id_str = id.to_string();

    // Counterparties whose cached friend_count must be re-derived once the
    // links are gone.
    let mut stmt = conn.prepare(
        "SELECT account_a, account_b FROM friend_links
         WHERE account_a = ?1 OR account_b = ?1",
    )?;
    let counterparts: Vec<String> = stmt
        .query_map(params![id_str], |row| {
            let a: String = row.get(0)?;
            let b: String = row.get(1)?;
            Ok(if a == id_str { b } else { a })
        })?
        .collect::<rusqlite::Result<_>>()?;
    drop(stmt);

    conn.execute(
        "DELETE FROM friend_links WHERE account_a = ?1 OR account_b = ?1",
        params![id_str],
    )?;
    conn.execute(
        "DELETE FROM friend_requests WHERE from_account = ?1 OR to_account = ?1",
        params![id_str],
    )?;
    conn.execute(
        "DELETE FROM reports WHERE reporter = ?1 OR reported = ?1",
        params![id_str],
    )?;
    conn.execute(
        "DELETE FROM chats WHERE account_a = ?1 OR account_b = ?1",
        params![id_str],
    )?;

    for other in counterparts {
        recompute_friend_count(conn, Uuid::parse_str(&other)?)?;
    }

    tracing::debug!(account = %id, "purged account graph");
    Ok(())
}
