//! Read-only matchmaking query.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use uuid::Uuid;

use kindred_store::{Account, Database};

use crate::error::{CoreError, Result};

/// Pick a uniformly random account sharing the target attribute.
///
/// Eligible accounts share the (case-normalized) attribute, are not the
/// requester, are not deleted and are not inside an active ban window.
/// Ties are broken by randomness alone, never by insertion order.
pub fn find_match(
    db: &Database,
    requester: Uuid,
    target_attr: &str,
    now: DateTime<Utc>,
) -> Result<Account> {
    let target = target_attr.trim().to_ascii_uppercase();
    if target.is_empty() {
        return Err(CoreError::Validation(
            "missing personality type".to_string(),
        ));
    }

    let eligible: Vec<Account> = db
        .list_match_candidates(&target, requester)?
        .into_iter()
        .filter(|account| !account.is_banned(now))
        .collect();

    eligible
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or(CoreError::NoMatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_account, test_db};
    use chrono::Duration;
    use kindred_store::accounts;
    use std::collections::HashSet;

    #[test]
    fn match_excludes_self_deleted_and_banned() {
        let (_dir, db) = test_db();
        let alice = seed_account(&db, "alice", "INTJ");
        let bob = seed_account(&db, "bob", "INTJ");
        let carol = seed_account(&db, "carol", "INTJ");
        let dave = seed_account(&db, "dave", "INTJ");

        let now = Utc::now();
        accounts::mark_deleted(db.conn(), carol.id, None).unwrap();
        accounts::apply_ban(db.conn(), dave.id, now + Duration::hours(10), 1).unwrap();

        let matched = find_match(&db, alice.id, "INTJ", now).unwrap();
        assert_eq!(matched.id, bob.id);
    }

    #[test]
    fn expired_ban_window_restores_eligibility() {
        let (_dir, db) = test_db();
        let alice = seed_account(&db, "alice", "INTJ");
        let bob = seed_account(&db, "bob", "INTJ");

        let now = Utc::now();
        accounts::apply_ban(db.conn(), bob.id, now + Duration::hours(10), 1).unwrap();
        assert!(matches!(
            find_match(&db, alice.id, "INTJ", now).unwrap_err(),
            CoreError::NoMatch
        ));

        let later = now + Duration::hours(11);
        assert_eq!(find_match(&db, alice.id, "INTJ", later).unwrap().id, bob.id);
    }

    #[test]
    fn target_attribute_is_case_normalized() {
        let (_dir, db) = test_db();
        let alice = seed_account(&db, "alice", "ENFP");
        let bob = seed_account(&db, "bob", "INTJ");

        let matched = find_match(&db, alice.id, "intj", Utc::now()).unwrap();
        assert_eq!(matched.id, bob.id);
    }

    #[test]
    fn empty_eligible_set_is_no_match() {
        let (_dir, db) = test_db();
        let alice = seed_account(&db, "alice", "INTJ");
        assert!(matches!(
            find_match(&db, alice.id, "INTJ", Utc::now()).unwrap_err(),
            CoreError::NoMatch
        ));
        assert!(matches!(
            find_match(&db, alice.id, "  ", Utc::now()).unwrap_err(),
            CoreError::Validation(_)
        ));
    }

    #[test]
    fn every_pick_comes_from_the_eligible_set() {
        let (_dir, db) = test_db();
        let alice = seed_account(&db, "alice", "INTJ");
        let eligible: HashSet<Uuid> = (0..4)
            .map(|i| seed_account(&db, &format!("user{i}"), "INTJ").id)
            .collect();

        let now = Utc::now();
        for _ in 0..20 {
            let matched = find_match(&db, alice.id, "INTJ", now).unwrap();
            assert!(eligible.contains(&matched.id));
            assert_ne!(matched.id, alice.id);
        }
    }
}
