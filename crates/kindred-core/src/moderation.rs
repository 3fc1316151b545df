//! Report ledger and the moderation state machine.
//!
//! An account's moderation status moves between three states:
//!
//! - **Active, unbanned** -- the normal state.
//! - **Active, banned(until)** -- entered when reports from enough distinct
//!   origin addresses accumulate; left automatically once the stored
//!   timestamp elapses.  Expiry is a read-time check (`Account::is_banned`),
//!   never a scheduled job.
//! - **Deleted** -- terminal.  Entered by self-deletion or once the
//!   escalation counter reaches its ceiling; the username is never recycled.
//!
//! Each report submission is a single transaction: dedup checks, insert,
//! recount and any escalation cascade commit together or not at all.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use kindred_shared::constants::{BAN_COUNT_CEILING, BAN_WINDOW_HOURS, REPORT_ORIGIN_THRESHOLD};
use kindred_store::{accounts, purge, reports, Account, Database, Report};

use crate::error::{CoreError, Result};

/// File an abuse report against a username.
///
/// The caller only ever learns whether the submission itself was accepted;
/// whatever the moderation engine does to the target stays a side effect.
///
/// Rejections, in order: reporters that are missing, deleted or flagged as
/// coming through an anonymizing network (Forbidden); unknown or deleted
/// targets (NotFound); self-reports (Validation); an origin address that
/// has already filed against this target (DuplicateOrigin); a reporter that
/// has already filed against this target (DuplicateReporter).
pub fn submit_report(
    db: &mut Database,
    reporter_id: Uuid,
    reported_username: &str,
    origin_addr: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let tx = db.conn_mut().transaction()?;

    let reporter = match accounts::get_account(&tx, reporter_id)? {
        Some(account) if !account.deleted => account,
        _ => {
            return Err(CoreError::Forbidden(
                "reporter account is not active".to_string(),
            ))
        }
    };
    if reporter.is_vpn {
        return Err(CoreError::Forbidden(
            "reports from anonymized connections are not accepted".to_string(),
        ));
    }

    let target = match accounts::find_by_username(&tx, reported_username)? {
        Some(account) if !account.deleted => account,
        _ => return Err(CoreError::NotFound),
    };
    if target.id == reporter.id {
        return Err(CoreError::Validation("cannot report yourself".to_string()));
    }

    if reports::origin_already_reported(&tx, target.id, origin_addr)? {
        return Err(CoreError::DuplicateOrigin);
    }
    if reports::reporter_already_reported(&tx, target.id, reporter.id)? {
        return Err(CoreError::DuplicateReporter);
    }

    reports::insert_report(
        &tx,
        &Report {
            id: Uuid::new_v4(),
            reporter: reporter.id,
            reported: target.id,
            origin_addr: origin_addr.to_string(),
            created_at: now,
        },
    )?;

    // The distinct-origin recount is the authoritative trigger metric; the
    // per-origin guard above means raw row counting would give the same
    // number, but the recount is what the policy is defined over.
    let distinct = reports::distinct_origin_count(&tx, target.id)?;
    tracing::debug!(
        reported = %target.id,
        distinct_origins = distinct,
        "report recorded"
    );

    // Re-evaluated on every accepted report.  An active ban window absorbs
    // further reports; the next qualifying report after expiry starts the
    // next cycle.
    if distinct >= REPORT_ORIGIN_THRESHOLD && !target.is_banned(now) {
        escalate(&tx, &target, now)?;
    }

    tx.commit()?;
    Ok(())
}

/// Advance the target one escalation step: a fresh ban window, or terminal
/// removal once the incremented counter reaches the ceiling.
fn escalate(conn: &Connection, target: &Account, now: DateTime<Utc>) -> Result<()> {
    let ban_count = target.ban_count + 1;

    if ban_count >= BAN_COUNT_CEILING {
        tracing::warn!(
            account = %target.id,
            ban_count,
            "escalation ceiling reached, removing account"
        );
        purge::purge_account_graph(conn, target.id)?;
        accounts::mark_deleted(conn, target.id, Some(ban_count))?;
    } else {
        let until = now + Duration::hours(BAN_WINDOW_HOURS);
        tracing::warn!(
            account = %target.id,
            ban_count,
            until = %until,
            "report threshold reached, applying ban window"
        );
        accounts::apply_ban(conn, target.id, until, ban_count)?;
    }

    Ok(())
}

/// Voluntary account removal.
///
/// Cascades exactly like escalated removal -- the whole owned graph is
/// purged and the record soft-deleted with PII cleared -- but the ban
/// counter is left as it was and no threshold is involved.
pub fn self_delete(db: &mut Database, account_id: Uuid) -> Result<()> {
    let tx = db.conn_mut().transaction()?;

    if accounts::get_account(&tx, account_id)?.is_none() {
        return Err(CoreError::NotFound);
    }

    purge::purge_account_graph(&tx, account_id)?;
    accounts::mark_deleted(&tx, account_id, None)?;

    tx.commit()?;
    tracing::info!(account = %account_id, "account self-deleted");
    Ok(())
}
