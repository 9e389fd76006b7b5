//! Authentication models
//! Mission: Define user and authentication data structures

use crate::durable::users::{UserRole, UserStatus};
use serde::{Deserialize, Serialize};

/// JWT claims payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject (user id, as a string)
    pub username: String,
    pub role: UserRole,
    pub exp: usize,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: usize,
    pub role: UserRole,
    pub user: UserResponse,
}

/// User response (sanitized — never includes password_hash)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: String,
}

impl UserResponse {
    pub fn from_row(row: &crate::durable::users::UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username.clone(),
            role: row.role,
            status: row.status,
            created_at: row.created_at.clone(),
        }
    }
}

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_role_serializes_lowercase() {
        let json = serde_json::to_string(&UserRole::Admin).unwrap();
        assert_eq!(json, r#""admin""#);
    }
}
