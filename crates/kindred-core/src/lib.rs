//! # kindred-core
//!
//! The moderation and account-lifecycle state machine for the Kindred
//! social-matching service: registration and identity reclamation, the
//! credential/ban gate, matchmaking, the friend-request workflow, and the
//! report ledger with its escalation policy.
//!
//! Every operation here is a plain function over a [`kindred_store::Database`]
//! that runs as a single transaction; the HTTP boundary lives in
//! `kindred-server` and only ever sees the structured [`CoreError`] results.

pub mod credentials;
pub mod friends;
pub mod identity;
pub mod matchmaking;
pub mod moderation;

mod error;

pub use credentials::{Argon2Hasher, CredentialHasher};
pub use error::CoreError;

#[cfg(test)]
pub(crate) mod testutil {
    //! Shared fixtures for the in-crate tests.

    use chrono::Utc;
    use uuid::Uuid;

    use kindred_shared::Avatar;
    use kindred_store::{accounts, Account, Database};

    use crate::credentials::CredentialHasher;
    use crate::error::Result;
    use crate::identity::Registration;

    /// Reversible "hash" so identity tests stay fast; the real Argon2
    /// implementation has its own tests in `credentials`.
    pub struct PlainHasher;

    impl CredentialHasher for PlainHasher {
        fn hash(&self, password: &str) -> Result<String> {
            Ok(format!("plain:{password}"))
        }

        fn verify(&self, password: &str, stored: &str) -> bool {
            stored == format!("plain:{password}")
        }
    }

    pub fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    /// Insert an active account directly, bypassing registration.
    pub fn seed_account(db: &Database, username: &str, personality: &str) -> Account {
        let account = Account {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: username.to_string(),
            email: None,
            password_hash: "plain:password".to_string(),
            personality: Some(personality.to_string()),
            avatar: Some(Avatar::Cat),
            is_vpn: false,
            deleted: false,
            banned_until: None,
            ban_count: 0,
            friend_count: 0,
            created_at: Utc::now(),
        };
        accounts::insert_account(db.conn(), &account).unwrap();
        account
    }

    /// A minimal registration for `username` with password `"password"`.
    pub fn registration(username: &str) -> Registration {
        Registration {
            username: username.to_string(),
            password: "password".to_string(),
            display_name: None,
            email: None,
            personality: None,
            avatar: None,
        }
    }
}
