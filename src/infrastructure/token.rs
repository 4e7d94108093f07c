// Bearer token issuing and verification (HS256 JWT)

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::models::UserId;

/// JWT claims carried by blog bearer tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub username: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl Claims {
    pub fn user_id(&self) -> AppResult<UserId> {
        self.sub
            .parse()
            .map_err(|_| AppError::Unauthorized(format!("Invalid subject in token: {}", self.sub)))
    }
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    expire_secs: i64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            expire_secs: i64::try_from(config.expire_hours)
                .unwrap_or(i64::MAX / 3600)
                .saturating_mul(3600),
        }
    }

    pub fn issue(&self, user_id: UserId, username: &str, role: &str) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            role: role.to_string(),
            iat: now,
            exp: now.saturating_add(self.expire_secs),
            iss: self.issuer.clone(),
        };
        self.encode(&claims)
    }

    #[instrument(skip(self, token))]
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;
        Ok(token_data.claims)
    }

    fn encode(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            expire_hours: 24,
            issuer: "leaf-blog".to_string(),
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = TokenService::new(&auth_config("secret"));
        let token = tokens.issue(42, "alice", "admin").unwrap();

        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = TokenService::new(&auth_config("one"))
            .issue(1, "alice", "user")
            .unwrap();

        let err = TokenService::new(&auth_config("two")).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = TokenService::new(&auth_config("secret"));
        let now = Utc::now().timestamp();
        let token = tokens
            .encode(&Claims {
                sub: "1".to_string(),
                username: "alice".to_string(),
                role: "user".to_string(),
                iat: now - 7200,
                exp: now - 3600,
                iss: "leaf-blog".to_string(),
            })
            .unwrap();

        assert!(matches!(tokens.verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let tokens = TokenService::new(&auth_config("secret"));
        assert!(tokens.verify("not-a-jwt").is_err());
    }
}
