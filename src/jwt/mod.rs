//! JWT token handling
//!
//! Credential verification happens upstream; this service only consumes
//! bearer tokens signed with the shared secret and mints them for tests
//! and trusted issuers.

use crate::config::JwtConfig;
use crate::domain::Principal;
use crate::error::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Audience pinned into every access token
pub const ACCESS_TOKEN_AUDIENCE: &str = "syncboard";

/// Access token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Display name
    pub name: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl AccessClaims {
    /// Resolve the claims into a request principal.
    pub fn principal(&self) -> Result<Principal> {
        let user_id = Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Unauthorized("Malformed token subject".to_string()))?;
        Ok(Principal {
            user_id,
            display_name: self.name.clone(),
        })
    }
}

/// JWT token manager
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Create a Validation with a strict leeway (5 seconds) instead of the
    /// default 60 seconds, so tokens expire promptly while still tolerating
    /// minor clock skew.
    fn strict_validation(&self) -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.leeway = 5;
        v
    }

    /// Create an access token
    pub fn create_access_token(&self, user_id: Uuid, display_name: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.access_token_ttl_secs);

        let claims = AccessClaims {
            sub: user_id.to_string(),
            name: display_name.to_string(),
            iss: self.config.issuer.clone(),
            aud: ACCESS_TOKEN_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        let header = Header::new(Algorithm::HS256);
        encode(&header, &claims, &self.encoding_key).map_err(|e| AppError::Internal(e.into()))
    }

    /// Verify and decode an access token.
    ///
    /// Failures surface as `AppError::Jwt`; callers that need to tell an
    /// expired token apart from a forged one inspect the wrapped error kind.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims> {
        let mut validation = self.strict_validation();
        validation.set_audience(&[ACCESS_TOKEN_AUDIENCE]);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }

    /// Get token expiration TTL in seconds
    pub fn access_token_ttl(&self) -> i64 {
        self.config.access_token_ttl_secs
    }
}
