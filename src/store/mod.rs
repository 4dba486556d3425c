//! Durable refresh token records and the store contract.

pub mod memory;
pub mod sweeper;

pub use memory::MemoryTokenStore;
pub use sweeper::{ExpirySweeper, SweeperHandle};

use crate::error::TokenError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Bound a store call so no request-path operation can block indefinitely.
/// Elapse surfaces as a retryable infrastructure error, never as an
/// authorization failure.
pub(crate) async fn bounded_call<T>(
    limit: Duration,
    op: &'static str,
    fut: impl Future<Output = Result<T, TokenError>>,
) -> Result<T, TokenError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(TokenError::Timeout(format!(
            "store call {} exceeded {:?}",
            op, limit
        ))),
    }
}

/// Lifecycle record for one issued refresh token.
///
/// The raw token is never stored; `token_digest` is the record's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub token_digest: String,
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set at most once; never cleared
    pub revoked_at: Option<DateTime<Utc>>,
    /// Digest of the token that replaced this one; audit trail only,
    /// never consulted for authorization
    pub replaced_by_digest: Option<String>,
    pub issuer_ip: Option<String>,
    pub issuer_user_agent: Option<String>,
}

impl RefreshTokenRecord {
    pub fn new(
        token_digest: impl Into<String>,
        user_id: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token_digest: token_digest.into(),
            user_id: user_id.into(),
            issued_at,
            expires_at,
            revoked_at: None,
            replaced_by_digest: None,
            issuer_ip: None,
            issuer_user_agent: None,
        }
    }

    /// Attach best-effort client diagnostics captured at issuance.
    #[must_use]
    pub fn with_client(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.issuer_ip = ip;
        self.issuer_user_agent = user_agent;
        self
    }

    /// Computed on demand, never persisted.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Usable for rotation: unrevoked and unexpired.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && !self.is_expired(now)
    }
}

/// Store contract for refresh token records.
///
/// Every mutation that decides "is this token still usable" is a single
/// atomic conditional update; implementations must never expose a
/// read-then-write window to concurrent callers.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Create a new record.
    ///
    /// # Errors
    ///
    /// `TokenError::Conflict` if a record with the same digest exists.
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), TokenError>;

    async fn find_by_digest(&self, digest: &str)
        -> Result<Option<RefreshTokenRecord>, TokenError>;

    /// Atomically transition a record from unrevoked to revoked-now.
    ///
    /// Returns whether this call performed the transition; `false` when the
    /// record is absent or was already revoked. This is the concurrency
    /// primitive the rotation race rides on.
    async fn revoke_if_active(&self, digest: &str) -> Result<bool, TokenError>;

    /// Revoke every record for the owner that is unrevoked and unexpired
    /// at call time; returns the count revoked.
    async fn revoke_all_active_for_owner(&self, user_id: &str) -> Result<u64, TokenError>;

    /// Record which token replaced this one. Write-once: overwriting an
    /// existing successor is an error, never silent.
    async fn set_successor(&self, digest: &str, successor_digest: &str)
        -> Result<(), TokenError>;

    /// Remove up to `limit` records with `expires_at` before `cutoff`;
    /// returns the count removed. Revocation state is irrelevant here.
    async fn delete_expired(&self, cutoff: DateTime<Utc>, limit: usize)
        -> Result<u64, TokenError>;
}
