//! Refresh token rotation engine.
//!
//! State machine per record: Active until revoked (terminal) or swept at
//! expiry. The only path that issues new tokens is the one that wins the
//! atomic revoke on an Active record owned by the verified subject; every
//! other path rejects without issuing.

use crate::audit::{digest_prefix, AuditEvent, AuditSink};
use crate::context::RequestContext;
use crate::error::TokenError;
use crate::jwt::{digest, CredentialSigner};
use crate::metrics;
use crate::store::{bounded_call, RefreshTokenRecord, TokenStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Identity collaborator projection needed for issuance.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
}

/// Newly minted credential pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
}

/// Result of a logout attempt. Never an error: the transport clears client
/// credentials and reports success whatever happened here, so a failure is
/// surfaced as a variant instead of being hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// A live session was revoked
    SessionEnded,
    /// Token unknown, already revoked, or never issued here
    NothingToRevoke,
    /// The store call failed; revocation state unknown
    StoreFailed,
}

impl LogoutOutcome {
    #[must_use]
    pub const fn session_ended(&self) -> bool {
        matches!(self, Self::SessionEnded)
    }
}

pub struct RefreshTokenRotator {
    signer: Arc<CredentialSigner>,
    store: Arc<dyn TokenStore>,
    audit: Arc<dyn AuditSink>,
    store_timeout: Duration,
}

impl RefreshTokenRotator {
    pub fn new(
        signer: Arc<CredentialSigner>,
        store: Arc<dyn TokenStore>,
        audit: Arc<dyn AuditSink>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            signer,
            store,
            audit,
            store_timeout,
        }
    }

    /// Mint an access/refresh pair for a user (register/login path) and
    /// record the refresh token as a new active session.
    ///
    /// # Errors
    ///
    /// `TokenError::Conflict` on a digest collision (caller may retry with
    /// a fresh mint) or an infrastructure error from the store.
    pub async fn issue(
        &self,
        user: &UserIdentity,
        ctx: &RequestContext,
    ) -> Result<TokenPair, TokenError> {
        let (pair, refresh_digest) = self.mint(user, ctx).await?;
        metrics::record_tokens_issued("login");
        self.audit.record(
            ctx,
            AuditEvent::TokensIssued {
                user_id: user.id.clone(),
                refresh_digest_prefix: digest_prefix(&refresh_digest).to_string(),
            },
        );
        Ok(pair)
    }

    /// Rotate a presented refresh token.
    ///
    /// Accept / reuse-detected / reject per the record state:
    /// verification failure rejects untouched; a missing record is treated
    /// as reuse of an already-consumed token and burns every session of the
    /// claimed owner; an inactive record rejects untouched; an active
    /// record is atomically revoked and, only if this call performed that
    /// revoke, replaced with a fresh pair.
    pub async fn rotate(
        &self,
        presented: &str,
        ctx: &RequestContext,
    ) -> Result<TokenPair, TokenError> {
        let claims = match self.signer.verify_refresh(presented) {
            Ok(claims) => claims,
            Err(err) => {
                metrics::record_rotation("rejected_invalid");
                return Err(err);
            }
        };

        let presented_digest = digest(presented);
        let existing = bounded_call(
            self.store_timeout,
            "find_by_digest",
            self.store.find_by_digest(&presented_digest),
        )
        .await?;

        let Some(record) = existing else {
            // A verifiable token with no record was already consumed and
            // replaced (or swept); the holder is replaying it. Burn the
            // whole session family of the claimed owner.
            let revoked = bounded_call(
                self.store_timeout,
                "revoke_all_active_for_owner",
                self.store.revoke_all_active_for_owner(&claims.sub),
            )
            .await?;
            metrics::record_rotation("reuse_detected");
            metrics::record_tokens_revoked("reuse_detected", revoked);
            metrics::record_security_event("REUSE_DETECTED");
            self.audit.record(
                ctx,
                AuditEvent::ReuseDetected {
                    user_id: claims.sub.clone(),
                    digest_prefix: digest_prefix(&presented_digest).to_string(),
                    revoked_count: revoked,
                },
            );
            return Err(TokenError::ReuseDetected);
        };

        if record.user_id != claims.sub {
            warn!(
                digest_prefix = digest_prefix(&presented_digest),
                "refresh record owner does not match verified subject"
            );
            metrics::record_rotation("rejected_not_active");
            return Err(TokenError::NotActive);
        }

        if !record.is_active(Utc::now()) {
            metrics::record_rotation("rejected_not_active");
            return Err(TokenError::NotActive);
        }

        let won_revoke = bounded_call(
            self.store_timeout,
            "revoke_if_active",
            self.store.revoke_if_active(&presented_digest),
        )
        .await?;
        if !won_revoke {
            // A concurrent rotation of the same token got there first;
            // exactly one caller may receive new credentials.
            metrics::record_rotation("rejected_lost_race");
            return Err(TokenError::NotActive);
        }

        // The old session is terminated from here on. A failure below
        // leaves it terminated with no replacement; it is never reactivated.
        let user = UserIdentity {
            id: record.user_id.clone(),
            email: claims.email.clone(),
        };
        let (pair, new_digest) = self.mint(&user, ctx).await?;
        bounded_call(
            self.store_timeout,
            "set_successor",
            self.store.set_successor(&presented_digest, &new_digest),
        )
        .await?;

        metrics::record_rotation("rotated");
        self.audit.record(
            ctx,
            AuditEvent::TokenRotated {
                user_id: user.id,
                old_digest_prefix: digest_prefix(&presented_digest).to_string(),
                new_digest_prefix: digest_prefix(&new_digest).to_string(),
            },
        );
        Ok(pair)
    }

    /// End the session behind a presented refresh token.
    ///
    /// The token is digested without verification: a garbage value simply
    /// matches nothing. Infallible by design so the transport can always
    /// clear client credentials and report success.
    pub async fn logout(&self, presented: &str, ctx: &RequestContext) -> LogoutOutcome {
        let presented_digest = digest(presented);
        let prefix = digest_prefix(&presented_digest).to_string();

        match bounded_call(
            self.store_timeout,
            "revoke_if_active",
            self.store.revoke_if_active(&presented_digest),
        )
        .await
        {
            Ok(session_ended) => {
                if session_ended {
                    metrics::record_tokens_revoked("logout", 1);
                }
                self.audit.record(
                    ctx,
                    AuditEvent::LoggedOut {
                        digest_prefix: prefix,
                        session_ended,
                    },
                );
                if session_ended {
                    LogoutOutcome::SessionEnded
                } else {
                    LogoutOutcome::NothingToRevoke
                }
            }
            Err(error) => {
                self.audit.record(
                    ctx,
                    AuditEvent::LogoutStoreFailed {
                        digest_prefix: prefix,
                        error: error.to_string(),
                    },
                );
                LogoutOutcome::StoreFailed
            }
        }
    }

    /// Sign a fresh pair and insert the refresh record.
    async fn mint(
        &self,
        user: &UserIdentity,
        ctx: &RequestContext,
    ) -> Result<(TokenPair, String), TokenError> {
        let (access_token, access_claims) = self.signer.sign_access(&user.id, &user.email)?;
        let (refresh_token, refresh_claims) = self.signer.sign_refresh(&user.id, &user.email)?;

        let refresh_digest = digest(&refresh_token);
        let record = RefreshTokenRecord::new(
            &refresh_digest,
            &user.id,
            refresh_claims.issued_at(),
            refresh_claims.expires_at(),
        )
        .with_client(ctx.ip.clone(), ctx.user_agent.clone());

        bounded_call(self.store_timeout, "insert", self.store.insert(record)).await?;

        Ok((
            TokenPair {
                access_token,
                refresh_token,
                access_expires_at: access_claims.expires_at(),
            },
            refresh_digest,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::TracingAuditSink;
    use crate::config::Config;
    use crate::store::MemoryTokenStore;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;

    fn test_config() -> Config {
        Config {
            access_token_secret: "access-secret-for-tests".to_string(),
            refresh_token_secret: "refresh-secret-for-tests".to_string(),
            jwt_issuer: "auth-platform".to_string(),
            jwt_audience: "api".to_string(),
            access_token_ttl: Duration::from_secs(900),
            refresh_token_ttl: Duration::from_secs(604_800),
            store_timeout: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(3600),
            sweep_batch_size: 500,
        }
    }

    fn test_rotator(store: Arc<dyn TokenStore>) -> RefreshTokenRotator {
        let config = test_config();
        RefreshTokenRotator::new(
            Arc::new(CredentialSigner::new(&config).unwrap()),
            store,
            Arc::new(TracingAuditSink),
            config.store_timeout,
        )
    }

    /// Store whose every call never completes; exercises the timeout bound.
    struct HangingStore;

    #[async_trait]
    impl TokenStore for HangingStore {
        async fn insert(&self, _record: RefreshTokenRecord) -> Result<(), TokenError> {
            std::future::pending().await
        }
        async fn find_by_digest(
            &self,
            _digest: &str,
        ) -> Result<Option<RefreshTokenRecord>, TokenError> {
            std::future::pending().await
        }
        async fn revoke_if_active(&self, _digest: &str) -> Result<bool, TokenError> {
            std::future::pending().await
        }
        async fn revoke_all_active_for_owner(&self, _user_id: &str) -> Result<u64, TokenError> {
            std::future::pending().await
        }
        async fn set_successor(
            &self,
            _digest: &str,
            _successor_digest: &str,
        ) -> Result<(), TokenError> {
            std::future::pending().await
        }
        async fn delete_expired(
            &self,
            _cutoff: DateTime<Utc>,
            _limit: usize,
        ) -> Result<u64, TokenError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_expired_record_rejected_without_mutation() {
        let store = Arc::new(MemoryTokenStore::new());
        let config = test_config();
        let signer = CredentialSigner::new(&config).unwrap();

        // Valid token whose record has already passed its expiry.
        let (token, claims) = signer.sign_refresh("user-1", "user@example.com").unwrap();
        let now = Utc::now();
        let record = RefreshTokenRecord::new(
            digest(&token),
            &claims.sub,
            now - ChronoDuration::hours(2),
            now - ChronoDuration::hours(1),
        );
        store.insert(record).await.unwrap();

        let rotator = test_rotator(store.clone());
        let ctx = RequestContext::new();
        let result = rotator.rotate(&token, &ctx).await;
        assert!(matches!(result, Err(TokenError::NotActive)));

        // No revocation happened; only expiry makes it inactive.
        let stored = store.find_by_digest(&digest(&token)).await.unwrap().unwrap();
        assert!(stored.revoked_at.is_none());
    }

    #[tokio::test]
    async fn test_owner_mismatch_rejected_without_mutation() {
        let store = Arc::new(MemoryTokenStore::new());
        let config = test_config();
        let signer = CredentialSigner::new(&config).unwrap();

        let (token, _) = signer.sign_refresh("user-1", "user@example.com").unwrap();
        let now = Utc::now();
        let record = RefreshTokenRecord::new(
            digest(&token),
            "some-other-user",
            now,
            now + ChronoDuration::days(7),
        );
        store.insert(record).await.unwrap();

        let rotator = test_rotator(store.clone());
        let result = rotator.rotate(&token, &RequestContext::new()).await;
        assert!(matches!(result, Err(TokenError::NotActive)));

        let stored = store.find_by_digest(&digest(&token)).await.unwrap().unwrap();
        assert!(stored.revoked_at.is_none());
    }

    #[tokio::test]
    async fn test_store_timeout_surfaces_as_retryable() {
        let config = test_config();
        let rotator = RefreshTokenRotator::new(
            Arc::new(CredentialSigner::new(&config).unwrap()),
            Arc::new(HangingStore),
            Arc::new(TracingAuditSink),
            Duration::from_millis(20),
        );

        let signer = CredentialSigner::new(&config).unwrap();
        let (token, _) = signer.sign_refresh("user-1", "user@example.com").unwrap();

        let result = rotator.rotate(&token, &RequestContext::new()).await;
        match result {
            Err(err) => {
                assert!(matches!(err, TokenError::Timeout(_)));
                assert!(err.is_retryable());
            }
            Ok(_) => panic!("rotation against a hung store must not succeed"),
        }
    }

    #[tokio::test]
    async fn test_logout_never_errors_on_store_failure() {
        let config = test_config();
        let rotator = RefreshTokenRotator::new(
            Arc::new(CredentialSigner::new(&config).unwrap()),
            Arc::new(HangingStore),
            Arc::new(TracingAuditSink),
            Duration::from_millis(20),
        );

        let outcome = rotator.logout("whatever", &RequestContext::new()).await;
        assert_eq!(outcome, LogoutOutcome::StoreFailed);
        assert!(!outcome.session_ended());
    }
}
