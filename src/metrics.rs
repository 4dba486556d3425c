//! Prometheus metrics for Session Service.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, CounterVec};

/// Credential pairs issued.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_tokens_issued_total",
        "Total number of credential pairs issued",
        &["trigger"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Rotation attempts by outcome.
pub static ROTATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_rotations_total",
        "Total number of refresh token rotation attempts",
        &["outcome"]
    )
    .expect("Failed to register rotations metric")
});

/// Revocations by reason.
pub static TOKENS_REVOKED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_tokens_revoked_total",
        "Total number of refresh tokens revoked",
        &["reason"]
    )
    .expect("Failed to register tokens_revoked metric")
});

/// Security events (reuse detection).
pub static SECURITY_EVENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_security_events_total",
        "Total number of security events",
        &["event_type"]
    )
    .expect("Failed to register security_events metric")
});

/// Record a credential pair issuance.
pub fn record_tokens_issued(trigger: &str) {
    TOKENS_ISSUED.with_label_values(&[trigger]).inc();
}

/// Record a rotation attempt outcome.
pub fn record_rotation(outcome: &str) {
    ROTATIONS.with_label_values(&[outcome]).inc();
}

/// Record token revocations.
pub fn record_tokens_revoked(reason: &str, count: u64) {
    TOKENS_REVOKED
        .with_label_values(&[reason])
        .inc_by(count as f64);
}

/// Record a security event.
pub fn record_security_event(event_type: &str) {
    SECURITY_EVENTS.with_label_values(&[event_type]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_rotation() {
        record_rotation("rotated");
        let value = ROTATIONS.with_label_values(&["rotated"]).get();
        assert!(value > 0.0);
    }

    #[test]
    fn test_record_revocations_adds_count() {
        record_tokens_revoked("logout_all", 3);
        let value = TOKENS_REVOKED.with_label_values(&["logout_all"]).get();
        assert!(value >= 3.0);
    }

    #[test]
    fn test_record_security_event() {
        record_security_event("REUSE_DETECTED");
        let value = SECURITY_EVENTS
            .with_label_values(&["REUSE_DETECTED"])
            .get();
        assert!(value > 0.0);
    }
}
