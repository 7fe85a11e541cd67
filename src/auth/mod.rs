pub mod policy;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::types::Role;

pub const NOT_AUTHORIZED: &str = "Not authorized to access this route";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: impl Into<String>, role: Role, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id.into(),
            role,
            iat: now.timestamp(),
            exp,
        }
    }
}

/// The authenticated caller, as loaded from the user store
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn generate_jwt(claims: &Claims, security: &SecurityConfig) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Sign a token for a user with the configured lifetime.
pub fn issue_token(user_id: &str, role: Role, security: &SecurityConfig) -> Result<String, AuthError> {
    generate_jwt(&Claims::new(user_id, role, security.jwt_expiry_hours), security)
}

pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security() -> SecurityConfig {
        SecurityConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 1,
            cors_origins: vec![],
        }
    }

    #[test]
    fn token_round_trip_keeps_subject_and_role() {
        let token = issue_token("user-1", Role::Publisher, &security()).unwrap();
        let claims = validate_jwt(&token, &security()).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, Role::Publisher);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_tokens_signed_with_another_secret() {
        let token = issue_token("user-1", Role::User, &security()).unwrap();
        let mut other = security();
        other.jwt_secret = "different".to_string();
        assert!(matches!(validate_jwt(&token, &other), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn rejects_expired_tokens() {
        let mut claims = Claims::new("user-1", Role::User, 1);
        claims.iat -= 10_000;
        claims.exp = claims.iat + 1;
        let token = generate_jwt(&claims, &security()).unwrap();
        assert!(validate_jwt(&token, &security()).is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("123456").unwrap();
        assert_ne!(hash, "123456");
        assert!(verify_password("123456", &hash));
        assert!(!verify_password("654321", &hash));
        assert!(!verify_password("123456", "not-a-hash"));
    }
}
