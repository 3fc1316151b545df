//! Account registration, credential verification and profile access.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use kindred_shared::Avatar;
use kindred_store::{accounts, purge, Account, Database};

use crate::credentials::CredentialHasher;
use crate::error::{CoreError, Result};

/// Input to [`register`].  Everything beyond username/password is optional.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub personality: Option<String>,
    pub avatar: Option<String>,
}

/// Create a new account, reclaiming the username if an active account holds it.
///
/// Username policy:
/// - held by a *deleted* account: rejected, the name is reserved forever;
/// - held by an *active* account: that account and everything it owns are
///   purged inside the same transaction, then the new account is created
///   under the same username.  Replace, don't reject.
///
/// The returned account carries a fresh id and credential hash, independent
/// of any prior holder.
pub fn register(
    db: &mut Database,
    hasher: &dyn CredentialHasher,
    registration: Registration,
) -> Result<Account> {
    let username = registration.username.trim();
    if username.is_empty() || registration.password.is_empty() {
        return Err(CoreError::Validation(
            "missing username or password".to_string(),
        ));
    }

    let avatar = match registration.avatar.as_deref() {
        Some(tag) => Avatar::parse(tag)
            .ok_or_else(|| CoreError::Validation(format!("invalid avatar: {tag}")))
            .map(Some)?,
        // Original default for profiles that never picked one.
        None => Some(Avatar::Cat),
    };

    let display_name = registration
        .display_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| username.to_string());

    let password_hash = hasher.hash(&registration.password)?;

    let account = Account {
        id: Uuid::new_v4(),
        username: username.to_string(),
        display_name,
        email: registration.email,
        password_hash,
        personality: registration
            .personality
            .map(|p| p.trim().to_ascii_uppercase()),
        avatar,
        is_vpn: false,
        deleted: false,
        banned_until: None,
        ban_count: 0,
        friend_count: 0,
        created_at: Utc::now(),
    };

    let tx = db.conn_mut().transaction()?;

    match accounts::find_by_username(&tx, username)? {
        Some(existing) if existing.deleted => return Err(CoreError::ReservedUsername),
        Some(existing) => {
            tracing::info!(
                username,
                replaced = %existing.id,
                "re-registration replaces the active username holder"
            );
            purge::purge_account_graph(&tx, existing.id)?;
            accounts::delete_account_row(&tx, existing.id)?;
        }
        None => {}
    }

    accounts::insert_account(&tx, &account)?;
    tx.commit()?;

    tracing::info!(username, id = %account.id, "account registered");
    Ok(account)
}

/// Verify credentials and apply the ban gate.
///
/// Unknown usernames, deleted accounts and wrong passwords all collapse into
/// the same [`CoreError::InvalidCredentials`] so the caller boundary never
/// leaks username existence.  The ban window is checked last and surfaces
/// its expiry.
pub fn login(
    db: &Database,
    hasher: &dyn CredentialHasher,
    username: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<Account> {
    let Some(account) = db.find_account_by_username(username)? else {
        return Err(CoreError::InvalidCredentials);
    };
    if account.deleted || !hasher.verify(password, &account.password_hash) {
        return Err(CoreError::InvalidCredentials);
    }
    match account.banned_until {
        Some(until) if now < until => Err(CoreError::Banned { until }),
        _ => Ok(account),
    }
}

/// The caller's own account record.
pub fn profile(db: &Database, id: Uuid) -> Result<Account> {
    db.get_account(id)?.ok_or(CoreError::NotFound)
}

/// Store a quiz result (or clear it).  The attribute is upper-cased so
/// matchmaking comparisons stay case-insensitive.
pub fn set_personality(db: &Database, id: Uuid, personality: Option<&str>) -> Result<()> {
    let normalized = personality.map(|p| p.trim().to_ascii_uppercase());
    let updated = db.set_personality(id, normalized.as_deref())?;
    if !updated {
        return Err(CoreError::NotFound);
    }
    Ok(())
}

/// Public lookup by username; deleted accounts are invisible here.
pub fn find_visible(db: &Database, username: &str) -> Result<Account> {
    match db.find_account_by_username(username)? {
        Some(account) if !account.deleted => Ok(account),
        _ => Err(CoreError::NotFound),
    }
}
