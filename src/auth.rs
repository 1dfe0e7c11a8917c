//! Bearer-token authentication
//!
//! Stateless HS256 JWTs signed with a secret from the environment, plus
//! argon2 password hashing for the account endpoints. The middleware is
//! layered onto protected routes only; public routes never see it.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use anyhow::{anyhow, Result};
use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::env;

use crate::errors::ErrorResponse;

/// Fallback signing secret for development. Refused in production mode.
const DEV_SECRET: &str = "stride-dev-secret-change-in-production";

/// Token authentication errors
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken(String),
    NotConfigured,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_MISSING",
                "Missing Authorization bearer token".to_string(),
            ),
            AuthError::InvalidToken(reason) => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_INVALID",
                format!("Invalid authorization token: {reason}"),
            ),
            AuthError::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "AUTH_NOT_CONFIGURED",
                "JWT secret not configured. Set STRIDE_JWT_SECRET environment variable.".to_string(),
            ),
        };

        let body = ErrorResponse {
            code: code.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

/// JWT claims carried by every issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Account email at issue time
    pub email: String,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Authenticated caller identity, inserted into request extensions
/// by the middleware and read by protected handlers.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Resolve the signing secret from the environment
///
/// In production, refuses to operate without an explicit secret.
/// In development, falls back to a well-known key with a warning.
fn jwt_secret() -> Result<String, AuthError> {
    match env::var("STRIDE_JWT_SECRET") {
        Ok(secret) if !secret.trim().is_empty() => Ok(secret),
        _ => {
            let is_production = env::var("STRIDE_ENV")
                .map(|v| v.to_lowercase() == "production" || v.to_lowercase() == "prod")
                .unwrap_or(false);

            if is_production {
                tracing::error!("STRIDE_JWT_SECRET not set in production mode");
                return Err(AuthError::NotConfigured);
            }

            tracing::warn!(
                "STRIDE_JWT_SECRET not set - using development secret (not for production!)"
            );
            Ok(DEV_SECRET.to_string())
        }
    }
}

/// Issue a signed token for a user
pub fn issue_token(user_id: &str, email: &str, ttl_hours: i64) -> Result<String> {
    let secret = jwt_secret().map_err(|_| anyhow!("JWT secret not configured"))?;
    let now = chrono::Utc::now();

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::hours(ttl_hours)).timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow!("Failed to sign token: {e}"))
}

/// Verify a token's signature and expiry
pub fn verify_token(token: &str) -> Result<Claims, AuthError> {
    let secret = jwt_secret()?;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Extract the bearer token from an Authorization header value
pub fn extract_bearer(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .or_else(|| header_value.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Hash a password with argon2id (PHC string format)
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("Failed to hash password: {e}"))
}

/// Verify a password against a stored PHC hash
///
/// Returns Ok(false) on mismatch; Err only when the stored hash is corrupt.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| anyhow!("Stored password hash is invalid: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Authentication middleware. Layered onto the protected route set only;
/// public routes never pass through here.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    // Extract and clone the bearer token (borrow ends after this expression)
    let token = match request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
        .map(|s| s.to_string())
    {
        Some(token) => token,
        None => return AuthError::MissingToken.into_response(),
    };

    let claims = match verify_token(&token) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
    });

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_test_secret() {
        env::set_var("STRIDE_JWT_SECRET", "unit-test-secret");
    }

    #[test]
    fn test_token_roundtrip() {
        set_test_secret();

        let token = issue_token("user-1", "a@example.com", 1).unwrap();
        let claims = verify_token(&token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "a@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expired_token_rejected() {
        set_test_secret();

        let token = issue_token("user-1", "a@example.com", -1).unwrap();
        assert!(verify_token(&token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        set_test_secret();

        assert!(verify_token("not.a.token").is_err());
        assert!(verify_token("").is_err());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("bearer abc123"), Some("abc123"));
        assert_eq!(extract_bearer("Basic abc123"), None);
        assert_eq!(extract_bearer("Bearer "), None);
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("hunter42").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter42", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_hashes_use_distinct_salts() {
        let h1 = hash_password("same-password").unwrap();
        let h2 = hash_password("same-password").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_corrupt_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
