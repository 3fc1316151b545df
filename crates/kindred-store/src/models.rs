//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! to the API layer; the server still defines its own response shapes so
//! that `password_hash` never leaves the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kindred_shared::{Avatar, RequestStatus};

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A registered account with its full lifecycle state.
///
/// Lifecycle is `deleted` plus an independent temporal ban window: an active
/// account may be banned without being deleted, and a deleted account keeps
/// its row (and its username) forever.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    /// Unique account identifier.
    pub id: Uuid,
    /// Unique username.  Immutable while the account is active, permanently
    /// reserved once the account is deleted.
    pub username: String,
    /// Human-readable display name; replaced by a placeholder on deletion.
    pub display_name: String,
    pub email: Option<String>,
    /// Credential hash as produced by the configured hasher.
    pub password_hash: String,
    /// Personality-type attribute used for matchmaking (upper-cased).
    pub personality: Option<String>,
    pub avatar: Option<Avatar>,
    /// Whether the account is known to connect through an anonymizing
    /// network.  Such accounts may never file reports.
    pub is_vpn: bool,
    /// Soft-delete flag; terminal.
    pub deleted: bool,
    /// End of the current ban window.  `None` means not banned; expiry is a
    /// read-time check, never a scheduled job.
    pub banned_until: Option<DateTime<Utc>>,
    /// Number of times the moderation engine has escalated this account.
    /// Monotonically increasing.
    pub ban_count: u32,
    /// Cached cardinality of friend links touching this account, recomputed
    /// inside the transaction of whatever mutation changed the link set.
    pub friend_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Read-time ban predicate: the account is banned while `now` is before
    /// the stored window end.
    pub fn is_banned(&self, now: DateTime<Utc>) -> bool {
        matches!(self.banned_until, Some(until) if now < until)
    }
}

// ---------------------------------------------------------------------------
// FriendRequest
// ---------------------------------------------------------------------------

/// A directed friend request.  At most one *pending* row may exist for a
/// given ordered (from, to) pair; the reverse direction is tracked
/// independently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FriendRequest {
    pub id: Uuid,
    pub from_account: Uuid,
    pub to_account: Uuid,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// FriendLink
// ---------------------------------------------------------------------------

/// An unordered friendship between two accounts, created only by accepting
/// a [`FriendRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FriendLink {
    pub id: Uuid,
    pub account_a: Uuid,
    pub account_b: Uuid,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// One abuse report.  Deduplicated per (reporter, reported) and per
/// (origin_addr, reported) before insertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Report {
    pub id: Uuid,
    pub reporter: Uuid,
    pub reported: Uuid,
    /// Opaque network origin supplied by the caller boundary; the store only
    /// ever compares it for equality.
    pub origin_addr: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// PendingRequestView
// ---------------------------------------------------------------------------

/// A pending friend request joined with the sender's public profile, for
/// the incoming-requests listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingRequestView {
    pub id: Uuid,
    pub from_account: Uuid,
    pub from_username: String,
    pub display_name: String,
    pub avatar: Option<Avatar>,
}
