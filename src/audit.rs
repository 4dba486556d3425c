//! Structured audit events for session lifecycle operations.
//!
//! Sinks receive digests only, and only their prefix at that; a raw token
//! must never reach this module.

use crate::context::RequestContext;
use tracing::{info, warn};

const DIGEST_PREFIX_LEN: usize = 8;

/// Short prefix of a lowercase-hex digest, safe for logs.
#[must_use]
pub fn digest_prefix(digest: &str) -> &str {
    &digest[..digest.len().min(DIGEST_PREFIX_LEN)]
}

/// One security-relevant lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    TokensIssued {
        user_id: String,
        refresh_digest_prefix: String,
    },
    TokenRotated {
        user_id: String,
        old_digest_prefix: String,
        new_digest_prefix: String,
    },
    ReuseDetected {
        user_id: String,
        digest_prefix: String,
        revoked_count: u64,
    },
    LoggedOut {
        digest_prefix: String,
        session_ended: bool,
    },
    LogoutStoreFailed {
        digest_prefix: String,
        error: String,
    },
    LoggedOutAll {
        user_id: String,
        revoked_count: u64,
    },
}

/// Receives structured lifecycle events; implementations must be cheap
/// enough to call inline on the request path.
pub trait AuditSink: Send + Sync {
    fn record(&self, ctx: &RequestContext, event: AuditEvent);
}

/// Default sink: emits events as structured tracing records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, ctx: &RequestContext, event: AuditEvent) {
        let request_id = ctx.request_id;
        match event {
            AuditEvent::TokensIssued {
                user_id,
                refresh_digest_prefix,
            } => {
                info!(
                    %request_id,
                    %user_id,
                    %refresh_digest_prefix,
                    "issued credential pair"
                );
            }
            AuditEvent::TokenRotated {
                user_id,
                old_digest_prefix,
                new_digest_prefix,
            } => {
                info!(
                    %request_id,
                    %user_id,
                    %old_digest_prefix,
                    %new_digest_prefix,
                    "rotated refresh token"
                );
            }
            AuditEvent::ReuseDetected {
                user_id,
                digest_prefix,
                revoked_count,
            } => {
                warn!(
                    %request_id,
                    %user_id,
                    %digest_prefix,
                    revoked_count,
                    "refresh token re-use detected, revoked all sessions for owner"
                );
            }
            AuditEvent::LoggedOut {
                digest_prefix,
                session_ended,
            } => {
                info!(%request_id, %digest_prefix, session_ended, "logout");
            }
            AuditEvent::LogoutStoreFailed {
                digest_prefix,
                error,
            } => {
                warn!(
                    %request_id,
                    %digest_prefix,
                    %error,
                    "logout revocation failed, client credentials cleared anyway"
                );
            }
            AuditEvent::LoggedOutAll {
                user_id,
                revoked_count,
            } => {
                info!(%request_id, %user_id, revoked_count, "logout from all devices");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_prefix_bounds() {
        assert_eq!(digest_prefix("abcdef0123456789"), "abcdef01");
        assert_eq!(digest_prefix("abc"), "abc");
        assert_eq!(digest_prefix(""), "");
    }

    #[test]
    fn test_tracing_sink_accepts_all_events() {
        let sink = TracingAuditSink;
        let ctx = RequestContext::new();
        sink.record(
            &ctx,
            AuditEvent::TokensIssued {
                user_id: "user-1".to_string(),
                refresh_digest_prefix: "abcdef01".to_string(),
            },
        );
        sink.record(
            &ctx,
            AuditEvent::ReuseDetected {
                user_id: "user-1".to_string(),
                digest_prefix: "abcdef01".to_string(),
                revoked_count: 3,
            },
        );
    }
}
