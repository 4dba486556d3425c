//! In-memory token record store.
//!
//! All mutations take the write lock for their full read-check-write span,
//! which makes each conditional update a single atomic step. Suitable for
//! tests and single-process deployments; a shared deployment plugs a
//! durable implementation into the same trait.

use crate::error::TokenError;
use crate::store::{RefreshTokenRecord, TokenStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryTokenStore {
    records: RwLock<HashMap<String, RefreshTokenRecord>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), TokenError> {
        let mut records = self.records.write().await;
        if records.contains_key(&record.token_digest) {
            return Err(TokenError::Conflict);
        }
        records.insert(record.token_digest.clone(), record);
        Ok(())
    }

    async fn find_by_digest(
        &self,
        digest: &str,
    ) -> Result<Option<RefreshTokenRecord>, TokenError> {
        let records = self.records.read().await;
        Ok(records.get(digest).cloned())
    }

    async fn revoke_if_active(&self, digest: &str) -> Result<bool, TokenError> {
        let mut records = self.records.write().await;
        match records.get_mut(digest) {
            Some(record) if record.revoked_at.is_none() => {
                record.revoked_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_active_for_owner(&self, user_id: &str) -> Result<u64, TokenError> {
        let mut records = self.records.write().await;
        let now = Utc::now();
        let mut count = 0;
        for record in records.values_mut() {
            if record.user_id == user_id && record.is_active(now) {
                record.revoked_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }

    async fn set_successor(
        &self,
        digest: &str,
        successor_digest: &str,
    ) -> Result<(), TokenError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(digest)
            .ok_or_else(|| TokenError::internal("successor target record not found"))?;
        if record.replaced_by_digest.is_some() {
            return Err(TokenError::internal("successor already set"));
        }
        record.replaced_by_digest = Some(successor_digest.to_string());
        Ok(())
    }

    async fn delete_expired(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<u64, TokenError> {
        let mut records = self.records.write().await;
        let expired: Vec<String> = records
            .values()
            .filter(|r| r.expires_at < cutoff)
            .take(limit)
            .map(|r| r.token_digest.clone())
            .collect();
        for digest in &expired {
            records.remove(digest);
        }
        Ok(expired.len() as u64)
    }
}
