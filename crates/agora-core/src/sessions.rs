//! Session tokens backed by the `sessions` table.
//!
//! A token moves Absent → Active → (Expired | Revoked) → Absent. Expiry is
//! fixed when the token is issued and enforced lazily: the first
//! [`SessionManager::resolve`] that sees an expired row deletes it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use agora_db::Database;
use agora_types::models::UserId;
use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::error::{CoreError, CoreResult};

/// Random bytes per token (256 bits), hex-encoded on the wire.
pub const TOKEN_BYTES: usize = 32;
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// An opaque bearer token. `Debug` is redacted so tokens never reach logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Tokens this process could have issued: fixed length, lowercase hex.
    pub fn is_well_formed(raw: &str) -> bool {
        raw.len() == TOKEN_BYTES * 2 && raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub token: SessionToken,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionManager {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    ttl_millis: i64,
}

impl SessionManager {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            db,
            clock,
            ttl_millis: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Create a session for `user_id` expiring `ttl` from now.
    ///
    /// The row is upserted by token, so earlier sessions of the same user are
    /// left alone and expire on their own.
    pub fn issue(&self, user_id: UserId) -> CoreResult<Session> {
        let token = SessionToken::generate();
        let expiry = self.clock.now_millis().saturating_add(self.ttl_millis);

        self.db.upsert_session(token.as_str(), user_id, expiry)?;
        debug!("Issued session for user {}", user_id);

        Ok(Session {
            token,
            user_id,
            expires_at: DateTime::from_timestamp_millis(expiry).unwrap_or(DateTime::<Utc>::MAX_UTC),
        })
    }

    /// Map a token to its owner.
    ///
    /// Unknown tokens fail with `NotFound`. A token at or past its expiry is
    /// deleted and fails with `Expired`; a later call then sees `NotFound`.
    /// Two threads racing on the same expired token may both delete, and the
    /// second delete affecting no row is fine.
    pub fn resolve(&self, token: &str) -> CoreResult<UserId> {
        if !SessionToken::is_well_formed(token) {
            return Err(CoreError::NotFound("session"));
        }

        let row = self
            .db
            .get_session(token)?
            .ok_or(CoreError::NotFound("session"))?;

        if self.clock.now_millis() >= row.expiry {
            let removed = self.db.delete_session(token)?;
            debug!("Evicted expired session of user {} (rows removed: {})", row.user_id, removed);
            return Err(CoreError::Expired);
        }

        Ok(row.user_id)
    }

    /// Delete the session. Revoking an absent token is not an error.
    pub fn revoke(&self, token: &str) -> CoreResult<()> {
        if SessionToken::is_well_formed(token) {
            self.db.delete_session(token)?;
        }
        Ok(())
    }

    /// Gate for privileged operations: any resolution failure denies with
    /// `Unauthorized`.
    pub fn authorize(&self, token: Option<&str>) -> CoreResult<UserId> {
        let token = token.ok_or(CoreError::Unauthorized)?;
        self.resolve(token).map_err(|e| {
            if let CoreError::Internal(inner) = &e {
                error!("Session lookup failed: {:#}", inner);
            }
            CoreError::Unauthorized
        })
    }

    /// Remove every session whose expiry has passed. Optional; lazy eviction
    /// in [`resolve`](Self::resolve) works without it.
    pub fn sweep_expired(&self) -> CoreResult<usize> {
        let removed = self.db.delete_expired_sessions(self.clock.now_millis())?;
        if removed > 0 {
            info!("Session sweep removed {} expired sessions", removed);
        }
        Ok(removed)
    }
}
