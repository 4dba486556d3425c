use thiserror::Error;

/// Error type for all session credential operations.
///
/// The four authorization rejections (`Malformed`, `Expired`, `NotActive`,
/// `ReuseDetected`) never overlap with infrastructure failures
/// (`Unavailable`, `Timeout`), so a store outage can never masquerade as a
/// revoked session.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token expired")]
    Expired,

    #[error("refresh token not active")]
    NotActive,

    #[error("refresh token re-use detected, all sessions revoked")]
    ReuseDetected,

    #[error("token digest already exists")]
    Conflict,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation timed out: {0}")]
    Timeout(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl TokenError {
    /// Transient failures that may succeed on retry. Authorization
    /// rejections are never retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }

    /// Stable machine-readable error code for transport responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "TOKEN_MALFORMED",
            Self::Expired => "TOKEN_EXPIRED",
            Self::NotActive => "TOKEN_NOT_ACTIVE",
            Self::ReuseDetected => "TOKEN_REUSE_DETECTED",
            Self::Conflict => "TOKEN_DIGEST_CONFLICT",
            Self::Unavailable(_) => "STORE_UNAVAILABLE",
            Self::Timeout(_) => "STORE_TIMEOUT",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP-equivalent status for the transport collaborator. The mapping is
    /// fixed here so callers never reclassify a variant.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::Malformed(_) | Self::Expired | Self::NotActive | Self::ReuseDetected => 401,
            Self::Conflict => 409,
            Self::Unavailable(_) | Self::Timeout(_) => 503,
            Self::Config(_) | Self::Internal(_) => 500,
        }
    }

    /// Create a configuration error with the given message.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error with the given message.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}
