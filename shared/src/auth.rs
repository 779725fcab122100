//! Token issuance/verification and password hashing — consumed as a service
//! contract by C10's auth middleware and by the WebSocket upgrade handler.

use crate::{config::AuthConfig, error::AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    #[serde(rename = "access")]
    Access,
    #[serde(rename = "refresh")]
    Refresh,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: TokenType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// What the auth middleware injects into request extensions for handlers.
#[derive(Debug, Clone, Copy)]
pub struct UserContext {
    pub user_id: Uuid,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.token_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.token_secret.as_bytes()),
            access_ttl: Duration::hours(config.token_expiration_hours as i64),
            refresh_ttl: Duration::hours(config.refresh_expiration_hours as i64),
        }
    }

    pub fn generate_token_pair(&self, user_id: Uuid) -> Result<TokenPair> {
        let now = Utc::now();

        let access_claims = Claims {
            sub: user_id.to_string(),
            exp: (now + self.access_ttl).timestamp(),
            iat: now.timestamp(),
            token_type: TokenType::Access,
        };
        let token = encode(&Header::default(), &access_claims, &self.encoding_key)?;

        let refresh_claims = Claims {
            sub: user_id.to_string(),
            exp: (now + self.refresh_ttl).timestamp(),
            iat: now.timestamp(),
            token_type: TokenType::Refresh,
        };
        let refresh_token = encode(&Header::default(), &refresh_claims, &self.encoding_key)?;

        Ok(TokenPair {
            token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let validation = Validation::default();
        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::authentication("token has expired")
                }
                _ => AppError::authentication("invalid token"),
            }
        })?;
        Ok(data.claims)
    }

    pub fn extract_user_context(&self, token: &str) -> Result<UserContext> {
        let claims = self.validate_token(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AppError::authentication("access token required"));
        }
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::authentication("invalid subject claim"))?;
        Ok(UserContext { user_id })
    }

    pub fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.validate_token(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AppError::authentication("refresh token required"));
        }
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::authentication("invalid subject claim"))?;
        self.generate_token_pair(user_id)
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        bcrypt::verify(password, hash)
            .map_err(|e| AppError::internal(format!("password verification failed: {e}")))
    }

    pub fn extract_token_from_header<'a>(&self, auth_header: &'a str) -> Result<&'a str> {
        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::authentication("invalid authorization header format"))?;
        if token.is_empty() {
            return Err(AppError::authentication("empty token"));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(&AuthConfig {
            token_secret: "test-secret".to_string(),
            token_expiration_hours: 1,
            refresh_expiration_hours: 24,
        })
    }

    #[test]
    fn access_token_round_trips_to_the_same_user() {
        let auth = service();
        let user_id = Uuid::new_v4();
        let pair = auth.generate_token_pair(user_id).unwrap();
        let ctx = auth.extract_user_context(&pair.token).unwrap();
        assert_eq!(ctx.user_id, user_id);
    }

    #[test]
    fn refresh_token_rejected_as_access_token() {
        let auth = service();
        let pair = auth.generate_token_pair(Uuid::new_v4()).unwrap();
        assert!(auth.extract_user_context(&pair.refresh_token).is_err());
    }

    #[test]
    fn refresh_access_token_issues_a_new_pair_for_the_same_user() {
        let auth = service();
        let user_id = Uuid::new_v4();
        let pair = auth.generate_token_pair(user_id).unwrap();
        let refreshed = auth.refresh_access_token(&pair.refresh_token).unwrap();
        let ctx = auth.extract_user_context(&refreshed.token).unwrap();
        assert_eq!(ctx.user_id, user_id);
    }

    #[test]
    fn access_token_rejected_as_refresh_token() {
        let auth = service();
        let pair = auth.generate_token_pair(Uuid::new_v4()).unwrap();
        assert!(auth.refresh_access_token(&pair.token).is_err());
    }

    #[test]
    fn password_hash_verifies_correct_and_rejects_wrong() {
        let auth = service();
        let hash = auth.hash_password("correct horse battery staple").unwrap();
        assert!(auth.verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!auth.verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn extract_token_from_header_requires_bearer_prefix() {
        let auth = service();
        assert!(auth.extract_token_from_header("Bearer abc123").is_ok());
        assert!(auth.extract_token_from_header("Basic abc123").is_err());
        assert!(auth.extract_token_from_header("Bearer ").is_err());
    }
}
