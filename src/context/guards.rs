//! Authentication guards
//!
//! A guard turns request headers into the principal it authenticates.

use crate::moderation::Principal;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// JWT secret key (should be from environment in production)
static JWT_SECRET: Lazy<String> = Lazy::new(|| {
    std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "moderation-dev-secret-key-change-in-production".to_string())
});

/// Token lifetime for [`JwtGuard::issue`] (15 minutes)
const TOKEN_EXPIRATION_MINUTES: i64 = 15;

pub trait AuthGuard: Send + Sync {
    /// Name referenced by `user.guards`
    fn name(&self) -> &str;

    fn authenticate(&self, headers: &HeaderMap) -> Option<Principal>;
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (principal ID)
    pub sub: String,
    /// Principal morph type, the guard default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Bearer token guard
#[derive(Clone)]
pub struct JwtGuard {
    name: String,
    kind: String,
    secret: String,
}

impl JwtGuard {
    pub fn new(name: &str, kind: &str) -> Self {
        Self::with_secret(name, kind, &JWT_SECRET)
    }

    pub fn with_secret(name: &str, kind: &str, secret: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            secret: secret.to_string(),
        }
    }

    /// Sign a token for `subject`
    pub fn issue(&self, subject: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            kind: None,
            exp: (now + Duration::minutes(TOKEN_EXPIRATION_MINUTES)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    /// Decode and validate a JWT token
    pub fn decode_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

impl AuthGuard for JwtGuard {
    fn name(&self) -> &str {
        &self.name
    }

    fn authenticate(&self, headers: &HeaderMap) -> Option<Principal> {
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())?
            .strip_prefix("Bearer ")?;

        match self.decode_token(token) {
            Ok(claims) => Some(Principal::new(
                claims.sub,
                claims.kind.unwrap_or_else(|| self.kind.clone()),
            )),
            Err(e) => {
                debug!("Guard {} rejected token: {}", self.name, e);
                None
            }
        }
    }
}

/// Trusts an identity header set by an upstream proxy
#[derive(Debug, Clone)]
pub struct HeaderGuard {
    name: String,
    header: String,
    kind: String,
}

impl HeaderGuard {
    pub fn new(name: &str, header: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            header: header.to_string(),
            kind: kind.to_string(),
        }
    }
}

impl AuthGuard for HeaderGuard {
    fn name(&self) -> &str {
        &self.name
    }

    fn authenticate(&self, headers: &HeaderMap) -> Option<Principal> {
        headers
            .get(self.header.as_str())
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| Principal::new(id, self.kind.clone()))
    }
}
