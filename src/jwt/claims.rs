use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Token variant discriminator, embedded as the `typ` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Signed claim set shared by both token variants.
///
/// Unknown extra claims in a presented token are ignored on decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    /// Random unique id per mint; reserved for fine-grained blocklisting
    pub jti: String,
    pub typ: TokenKind,
    pub email: String,
}

impl Claims {
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        subject: impl Into<String>,
        email: impl Into<String>,
        kind: TokenKind,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now().timestamp();
        Claims {
            iss: issuer.into(),
            sub: subject.into(),
            aud: audience.into(),
            exp: now + ttl.as_secs() as i64,
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
            typ: kind,
            email: email.into(),
        }
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    #[must_use]
    pub fn issued_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.iat, 0).unwrap_or_else(Utc::now)
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new(
            "auth-platform",
            "api",
            "user-123",
            "user@example.com",
            TokenKind::Access,
            Duration::from_secs(900),
        );

        assert_eq!(claims.iss, "auth-platform");
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.typ, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, 900);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_jti_unique_per_mint() {
        let mint = || {
            Claims::new(
                "auth-platform",
                "api",
                "user-123",
                "user@example.com",
                TokenKind::Refresh,
                Duration::from_secs(60),
            )
        };
        assert_ne!(mint().jti, mint().jti);
    }

    #[test]
    fn test_claims_expiration() {
        let mut claims = Claims::new(
            "auth-platform",
            "api",
            "user-123",
            "user@example.com",
            TokenKind::Refresh,
            Duration::from_secs(3600),
        );
        assert!(!claims.is_expired());

        claims.exp = Utc::now().timestamp() - 3600;
        assert!(claims.is_expired());
    }

    #[test]
    fn test_token_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&TokenKind::Access).unwrap(),
            "\"access\""
        );
        assert_eq!(
            serde_json::to_string(&TokenKind::Refresh).unwrap(),
            "\"refresh\""
        );
    }

    #[test]
    fn test_unknown_claims_ignored() {
        let json = r#"{
            "iss": "auth-platform",
            "sub": "user-123",
            "aud": "api",
            "exp": 2000000000,
            "iat": 1000000000,
            "jti": "abc",
            "typ": "refresh",
            "email": "user@example.com",
            "scope": "read write",
            "nonce": "xyz"
        }"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.typ, TokenKind::Refresh);
    }
}
