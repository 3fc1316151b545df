//! Opaque bearer-token sessions.
//!
//! Tokens are random UUIDs held in an in-memory map with a fixed TTL; the
//! token *format* is deliberately meaningless to clients.  Expiry is a
//! read-time check on resolve, with a periodic purge for hygiene only.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A live session.
#[derive(Debug, Clone)]
struct Session {
    account_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// Issues and resolves session tokens.
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Mint a fresh token for the account.
    pub async fn issue(&self, account_id: Uuid) -> String {
        let token = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            token,
            Session {
                account_id,
                expires_at: Utc::now() + self.ttl,
            },
        );
        token.to_string()
    }

    /// Resolve a presented token to its account, if the token is known and
    /// not expired.
    pub async fn resolve(&self, token: &str) -> Option<Uuid> {
        let token = Uuid::parse_str(token.trim()).ok()?;
        let sessions = self.sessions.read().await;
        let session = sessions.get(&token)?;
        if Utc::now() < session.expires_at {
            Some(session.account_id)
        } else {
            None
        }
    }

    /// Drop every session belonging to an account (used when the account
    /// leaves the graph).  Returns how many were revoked.
    pub async fn revoke_account(&self, account_id: Uuid) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.account_id != account_id);
        before - sessions.len()
    }

    /// Evict expired entries.
    pub async fn purge_expired(&self) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| now < session.expires_at);
        let removed = before - sessions.len();
        if removed > 0 {
            debug!(removed, "Purged expired sessions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issue_then_resolve() {
        let store = SessionStore::new(Duration::days(7));
        let account = Uuid::new_v4();

        let token = store.issue(account).await;
        assert_eq!(store.resolve(&token).await, Some(account));
        assert_eq!(store.resolve("not-a-token").await, None);
        assert_eq!(store.resolve(&Uuid::new_v4().to_string()).await, None);
    }

    #[tokio::test]
    async fn expired_tokens_stop_resolving() {
        let store = SessionStore::new(Duration::seconds(-1));
        let token = store.issue(Uuid::new_v4()).await;
        assert_eq!(store.resolve(&token).await, None);

        store.purge_expired().await;
        assert!(store.sessions.read().await.is_empty());
    }

    #[tokio::test]
    async fn revoke_drops_every_session_of_the_account() {
        let store = SessionStore::new(Duration::days(7));
        let account = Uuid::new_v4();
        let other = Uuid::new_v4();

        let t1 = store.issue(account).await;
        let t2 = store.issue(account).await;
        let t3 = store.issue(other).await;

        assert_eq!(store.revoke_account(account).await, 2);
        assert_eq!(store.resolve(&t1).await, None);
        assert_eq!(store.resolve(&t2).await, None);
        assert_eq!(store.resolve(&t3).await, Some(other));
    }
}
