//! # kindred-store
//!
//! SQLite persistence for the Kindred service.
//!
//! The crate exposes a synchronous [`Database`] handle wrapping a
//! `rusqlite::Connection`, plus row-level helpers over plain connections so
//! that the core crate can compose several of them inside one transaction.
//! Migrations run on open and are guarded by the `user_version` pragma.

pub mod accounts;
pub mod database;
pub mod friends;
pub mod migrations;
pub mod models;
pub mod purge;
pub mod reports;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;

#[cfg(test)]
pub(crate) mod testutil {
    //! Shared fixtures for the in-crate tests.

    use chrono::Utc;
    use uuid::Uuid;

    use kindred_shared::{Avatar, RequestStatus};

    use crate::database::Database;
    use crate::models::{Account, FriendLink, FriendRequest, Report};

    pub fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    pub fn sample_account(username: &str, personality: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: username.to_string(),
            email: None,
            password_hash: "$argon2id$test".to_string(),
            personality: Some(personality.to_string()),
            avatar: Some(Avatar::Cat),
            is_vpn: false,
            deleted: false,
            banned_until: None,
            ban_count: 0,
            friend_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn sample_request(from: Uuid, to: Uuid) -> FriendRequest {
        FriendRequest {
            id: Uuid::new_v4(),
            from_account: from,
            to_account: to,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn sample_link(a: Uuid, b: Uuid) -> FriendLink {
        FriendLink {
            id: Uuid::new_v4(),
            account_a: a,
            account_b: b,
            created_at: Utc::now(),
        }
    }

    pub fn sample_report(reporter: Uuid, reported: Uuid, origin: &str) -> Report {
        Report {
            id: Uuid::new_v4(),
            reporter,
            reported,
            origin_addr: origin.to_string(),
            created_at: Utc::now(),
        }
    }
}
