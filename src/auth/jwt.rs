//! JWT token handler
//! Mission: generate and validate JWT tokens for authenticated sessions

use crate::auth::models::Claims;
use crate::durable::users::UserRow;
use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

pub struct JwtHandler {
    secret: String,
    expiration_hours: i64,
}

impl JwtHandler {
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            expiration_hours: 24,
        }
    }

    pub fn generate_token(&self, user: &UserRow) -> Result<(String, usize)> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(chrono::Duration::hours(self.expiration_hours))
            .context("invalid timestamp")?
            .timestamp() as usize;
        let expires_in = (self.expiration_hours * 3600) as usize;

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            role: user.role,
            exp: expiration,
        };

        debug!(user_id = user.id, "generating JWT");

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("failed to generate JWT")?;

        Ok((token, expires_in))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .context("invalid or expired token")?;

        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durable::users::{UserRole, UserStatus};

    fn test_user() -> UserRow {
        UserRow {
            id: 42,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: UserRole::User,
            status: UserStatus::Normal,
            points: 0,
            currency: 0,
            email_verified: true,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn generates_and_validates_a_token() {
        let handler = JwtHandler::new("test-secret".to_string());
        let user = test_user();

        let (token, expires_in) = handler.generate_token(&user).unwrap();
        assert_eq!(expires_in, 24 * 3600);

        let claims = handler.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn rejects_tokens_signed_with_a_different_secret() {
        let handler1 = JwtHandler::new("secret1".to_string());
        let handler2 = JwtHandler::new("secret2".to_string());
        let (token, _) = handler1.generate_token(&test_user()).unwrap();
        assert!(handler2.validate_token(&token).is_err());
    }

    #[test]
    fn rejects_malformed_tokens() {
        let handler = JwtHandler::new("test-secret".to_string());
        assert!(handler.validate_token("not.a.token").is_err());
    }
}
