//! Friend-request workflow: request, respond, unfriend.
//!
//! Every mutation runs as one transaction so the pending-dedup check, the
//! link mutation and the friend-count recomputation can never interleave
//! with a concurrent change to the same rows.

use chrono::Utc;
use uuid::Uuid;

use kindred_shared::{RequestStatus, RespondAction};
use kindred_store::{accounts, friends, Database, FriendLink, FriendRequest, PendingRequestView};

use crate::error::{CoreError, Result};

/// File a friend request from one account to another.
///
/// The ordered pair is what is deduplicated: a pending request in the
/// reverse direction does not block this one.
pub fn request_friend(db: &mut Database, from: Uuid, to: Uuid) -> Result<FriendRequest> {
    if from == to {
        return Err(CoreError::Forbidden(
            "cannot befriend yourself".to_string(),
        ));
    }

    let tx = db.conn_mut().transaction()?;

    match accounts::get_account(&tx, to)? {
        Some(target) if !target.deleted => {}
        _ => return Err(CoreError::NotFound),
    }

    if friends::pending_request_exists(&tx, from, to)? {
        return Err(CoreError::DuplicateRequest);
    }

    let request = FriendRequest {
        id: Uuid::new_v4(),
        from_account: from,
        to_account: to,
        status: RequestStatus::Pending,
        created_at: Utc::now(),
    };
    friends::insert_request(&tx, &request)?;
    tx.commit()?;

    tracing::debug!(from = %from, to = %to, request = %request.id, "friend request filed");
    Ok(request)
}

/// Accept or reject a pending request.  Only the request's target may
/// respond, and a request is terminal once handled.
///
/// Accepting creates the link and re-derives both endpoints' friend counts
/// from the link set inside the same transaction; rejecting records the
/// status and nothing else.
pub fn respond(
    db: &mut Database,
    request_id: Uuid,
    responder: Uuid,
    action: RespondAction,
) -> Result<()> {
    let tx = db.conn_mut().transaction()?;

    let Some(request) = friends::get_request(&tx, request_id)? else {
        return Err(CoreError::NotFound);
    };
    if request.to_account != responder {
        return Err(CoreError::Forbidden(
            "only the request target may respond".to_string(),
        ));
    }
    if request.status != RequestStatus::Pending {
        return Err(CoreError::RequestClosed);
    }

    match action {
        RespondAction::Accept => {
            friends::insert_link(
                &tx,
                &FriendLink {
                    id: Uuid::new_v4(),
                    account_a: request.from_account,
                    account_b: request.to_account,
                    created_at: Utc::now(),
                },
            )?;
            friends::set_request_status(&tx, request_id, RequestStatus::Accepted)?;
            friends::recompute_friend_count(&tx, request.from_account)?;
            friends::recompute_friend_count(&tx, request.to_account)?;
        }
        RespondAction::Reject => {
            friends::set_request_status(&tx, request_id, RequestStatus::Rejected)?;
        }
    }

    tx.commit()?;
    Ok(())
}

/// Remove any friendship between the pair, in either stored order, and
/// re-derive both cached counts.  Removing a non-existent link is a no-op.
pub fn unfriend(db: &mut Database, account: Uuid, other: Uuid) -> Result<()> {
    let tx = db.conn_mut().transaction()?;

    friends::delete_links_between(&tx, account, other)?;
    friends::recompute_friend_count(&tx, account)?;
    friends::recompute_friend_count(&tx, other)?;

    tx.commit()?;
    Ok(())
}

/// Pending requests addressed to the account, with sender profiles.
pub fn incoming_requests(db: &Database, account: Uuid) -> Result<Vec<PendingRequestView>> {
    Ok(db.incoming_requests(account)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_account, test_db};

    #[test]
    fn self_request_is_forbidden() {
        let (_dir, mut db) = test_db();
        let alice = seed_account(&db, "alice", "INTJ");
        let err = request_friend(&mut db, alice.id, alice.id).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[test]
    fn request_to_unknown_or_deleted_target_is_not_found() {
        let (_dir, mut db) = test_db();
        let alice = seed_account(&db, "alice", "INTJ");
        let bob = seed_account(&db, "bob", "ENFP");

        let err = request_friend(&mut db, alice.id, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, CoreError::NotFound));

        kindred_store::accounts::mark_deleted(db.conn(), bob.id, None).unwrap();
        let err = request_friend(&mut db, alice.id, bob.id).unwrap_err();
        assert!(matches!(err, CoreError::NotFound));
    }

    #[test]
    fn duplicate_pending_request_conflicts_but_reverse_is_independent() {
        let (_dir, mut db) = test_db();
        let bob = seed_account(&db, "bob", "INTJ");
        let carol = seed_account(&db, "carol", "ENFP");

        request_friend(&mut db, bob.id, carol.id).unwrap();
        let err = request_friend(&mut db, bob.id, carol.id).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateRequest));

        // Carol may still ask bob independently.
        request_friend(&mut db, carol.id, bob.id).unwrap();
    }

    #[test]
    fn respond_checks_existence_and_ownership() {
        let (_dir, mut db) = test_db();
        let alice = seed_account(&db, "alice", "INTJ");
        let bob = seed_account(&db, "bob", "ENFP");
        let mallory = seed_account(&db, "mallory", "ESTP");

        let err = respond(&mut db, Uuid::new_v4(), bob.id, RespondAction::Accept).unwrap_err();
        assert!(matches!(err, CoreError::NotFound));

        let request = request_friend(&mut db, alice.id, bob.id).unwrap();
        let err = respond(&mut db, request.id, mallory.id, RespondAction::Accept).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
        // The sender cannot accept their own request either.
        let err = respond(&mut db, request.id, alice.id, RespondAction::Accept).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[test]
    fn accept_creates_one_link_and_updates_both_counts() {
        let (_dir, mut db) = test_db();
        let bob = seed_account(&db, "bob", "INTJ");
        let carol = seed_account(&db, "carol", "ENFP");

        // Bob asks twice before carol responds; the second filing conflicts.
        let request = request_friend(&mut db, bob.id, carol.id).unwrap();
        assert!(matches!(
            request_friend(&mut db, bob.id, carol.id).unwrap_err(),
            CoreError::DuplicateRequest
        ));

        respond(&mut db, request.id, carol.id, RespondAction::Accept).unwrap();

        let bob_after = db.get_account(bob.id).unwrap().unwrap();
        let carol_after = db.get_account(carol.id).unwrap().unwrap();
        assert_eq!(bob_after.friend_count, 1);
        assert_eq!(carol_after.friend_count, 1);

        let links: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM friend_links", [], |row| row.get(0))
            .unwrap();
        assert_eq!(links, 1);
    }

    #[test]
    fn reject_records_status_without_side_effects() {
        let (_dir, mut db) = test_db();
        let alice = seed_account(&db, "alice", "INTJ");
        let bob = seed_account(&db, "bob", "ENFP");

        let request = request_friend(&mut db, alice.id, bob.id).unwrap();
        respond(&mut db, request.id, bob.id, RespondAction::Reject).unwrap();

        assert_eq!(db.get_account(alice.id).unwrap().unwrap().friend_count, 0);
        let links: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM friend_links", [], |row| row.get(0))
            .unwrap();
        assert_eq!(links, 0);

        // A rejected request does not block a fresh one for the same pair.
        request_friend(&mut db, alice.id, bob.id).unwrap();
    }

    #[test]
    fn handled_requests_are_terminal() {
        let (_dir, mut db) = test_db();
        let alice = seed_account(&db, "alice", "INTJ");
        let bob = seed_account(&db, "bob", "ENFP");

        let request = request_friend(&mut db, alice.id, bob.id).unwrap();
        respond(&mut db, request.id, bob.id, RespondAction::Accept).unwrap();

        // Re-accepting must not create a second link.
        let err = respond(&mut db, request.id, bob.id, RespondAction::Accept).unwrap_err();
        assert!(matches!(err, CoreError::RequestClosed));
        let err = respond(&mut db, request.id, bob.id, RespondAction::Reject).unwrap_err();
        assert!(matches!(err, CoreError::RequestClosed));

        assert_eq!(db.get_account(bob.id).unwrap().unwrap().friend_count, 1);
    }

    #[test]
    fn unfriend_removes_the_link_in_either_order_and_is_idempotent() {
        let (_dir, mut db) = test_db();
        let alice = seed_account(&db, "alice", "INTJ");
        let bob = seed_account(&db, "bob", "ENFP");

        let request = request_friend(&mut db, alice.id, bob.id).unwrap();
        respond(&mut db, request.id, bob.id, RespondAction::Accept).unwrap();

        // The link was stored as (alice, bob); unfriending as (bob, alice)
        // must still find it.
        unfriend(&mut db, bob.id, alice.id).unwrap();
        assert_eq!(db.get_account(alice.id).unwrap().unwrap().friend_count, 0);
        assert_eq!(db.get_account(bob.id).unwrap().unwrap().friend_count, 0);

        unfriend(&mut db, bob.id, alice.id).unwrap();
    }

    #[test]
    fn incoming_listing_shows_only_pending_requests_to_me() {
        let (_dir, mut db) = test_db();
        let alice = seed_account(&db, "alice", "INTJ");
        let bob = seed_account(&db, "bob", "ENFP");
        let carol = seed_account(&db, "carol", "ESTP");

        let from_alice = request_friend(&mut db, alice.id, carol.id).unwrap();
        request_friend(&mut db, bob.id, carol.id).unwrap();
        respond(&mut db, from_alice.id, carol.id, RespondAction::Reject).unwrap();

        let incoming = incoming_requests(&db, carol.id).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].from_username, "bob");
    }
}
