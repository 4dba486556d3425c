//! Owner-scoped session revocation.
//!
//! Logout-all rides the same store primitive as reuse-triggered mass
//! revocation but is a distinct, separately audited operation: one is a
//! user pressing a button, the other is an attack response.

use crate::audit::{AuditEvent, AuditSink};
use crate::context::RequestContext;
use crate::error::TokenError;
use crate::metrics;
use crate::store::{bounded_call, TokenStore};
use std::sync::Arc;
use std::time::Duration;

pub struct SessionRegistrar {
    store: Arc<dyn TokenStore>,
    audit: Arc<dyn AuditSink>,
    store_timeout: Duration,
}

impl SessionRegistrar {
    pub fn new(
        store: Arc<dyn TokenStore>,
        audit: Arc<dyn AuditSink>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            audit,
            store_timeout,
        }
    }

    /// Revoke every active session of a user; returns the count revoked.
    ///
    /// Zero is a normal outcome (nothing was active), not an error.
    pub async fn logout_all(
        &self,
        user_id: &str,
        ctx: &RequestContext,
    ) -> Result<u64, TokenError> {
        let revoked = bounded_call(
            self.store_timeout,
            "revoke_all_active_for_owner",
            self.store.revoke_all_active_for_owner(user_id),
        )
        .await?;

        metrics::record_tokens_revoked("logout_all", revoked);
        self.audit.record(
            ctx,
            AuditEvent::LoggedOutAll {
                user_id: user_id.to_string(),
                revoked_count: revoked,
            },
        );
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::TracingAuditSink;
    use crate::store::{MemoryTokenStore, RefreshTokenRecord};
    use chrono::{Duration as ChronoDuration, Utc};

    fn record(digest: &str, user: &str) -> RefreshTokenRecord {
        let now = Utc::now();
        RefreshTokenRecord::new(digest, user, now, now + ChronoDuration::days(7))
    }

    #[tokio::test]
    async fn test_logout_all_revokes_only_owner_sessions() {
        let store = Arc::new(MemoryTokenStore::new());
        store.insert(record("d1", "user-1")).await.unwrap();
        store.insert(record("d2", "user-1")).await.unwrap();
        store.insert(record("d3", "user-2")).await.unwrap();

        let registrar = SessionRegistrar::new(
            store.clone(),
            Arc::new(TracingAuditSink),
            Duration::from_secs(5),
        );
        let ctx = RequestContext::new();

        assert_eq!(registrar.logout_all("user-1", &ctx).await.unwrap(), 2);
        assert_eq!(registrar.logout_all("user-1", &ctx).await.unwrap(), 0);

        let untouched = store.find_by_digest("d3").await.unwrap().unwrap();
        assert!(untouched.revoked_at.is_none());
    }
}
