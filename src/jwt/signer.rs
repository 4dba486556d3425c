//! HMAC credential signing and verification.
//!
//! Access and refresh tokens live in independent key namespaces: a leaked
//! access secret cannot mint refresh tokens and vice versa.

use crate::config::Config;
use crate::error::TokenError;
use crate::jwt::claims::{Claims, TokenKind};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// One-way digest of a raw token, rendered as lowercase hex.
///
/// This is the only representation of a token the store or logs ever see.
#[must_use]
pub fn digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Stateless signer/verifier for both credential variants.
pub struct CredentialSigner {
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    access_keys: KeyPair,
    refresh_keys: KeyPair,
}

impl CredentialSigner {
    /// Build a signer from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Config` when a secret is empty or the two
    /// namespaces share one. Signing itself never fails on valid input.
    pub fn new(config: &Config) -> Result<Self, TokenError> {
        if config.access_token_secret.is_empty() || config.refresh_token_secret.is_empty() {
            return Err(TokenError::config("token secrets must be non-empty"));
        }
        if config.access_token_secret == config.refresh_token_secret {
            return Err(TokenError::config(
                "access and refresh namespaces must use distinct secrets",
            ));
        }

        Ok(Self {
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
            access_keys: KeyPair::from_secret(&config.access_token_secret),
            refresh_keys: KeyPair::from_secret(&config.refresh_token_secret),
        })
    }

    /// Mint a short-lived access token for the given subject.
    pub fn sign_access(&self, sub: &str, email: &str) -> Result<(String, Claims), TokenError> {
        self.sign(TokenKind::Access, sub, email)
    }

    /// Mint a long-lived refresh token for the given subject.
    pub fn sign_refresh(&self, sub: &str, email: &str) -> Result<(String, Claims), TokenError> {
        self.sign(TokenKind::Refresh, sub, email)
    }

    /// Verify an access token and return its claims.
    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(TokenKind::Access, token)
    }

    /// Verify a refresh token and return its claims.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify(TokenKind::Refresh, token)
    }

    fn sign(&self, kind: TokenKind, sub: &str, email: &str) -> Result<(String, Claims), TokenError> {
        let (keys, ttl) = match kind {
            TokenKind::Access => (&self.access_keys, self.access_ttl),
            TokenKind::Refresh => (&self.refresh_keys, self.refresh_ttl),
        };
        let claims = Claims::new(&self.issuer, &self.audience, sub, email, kind, ttl);
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| TokenError::internal(format!("failed to sign token: {}", e)))?;
        Ok((token, claims))
    }

    fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        let keys = match kind {
            TokenKind::Access => &self.access_keys,
            TokenKind::Refresh => &self.refresh_keys,
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &keys.decoding, &validation)?;
        if data.claims.typ != kind {
            return Err(TokenError::Malformed(format!(
                "expected {} token, got {}",
                kind.as_str(),
                data.claims.typ.as_str()
            )));
        }
        Ok(data.claims)
    }
}
