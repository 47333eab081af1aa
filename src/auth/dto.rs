use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::auth::claims::Role;
use crate::auth::repo::User;
use crate::error::ApiError;

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]{3,16}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Body for both registration and login.
#[derive(Debug, Deserialize)]
pub struct UserAuthRequest {
    pub username: String,
    pub password: String,
}

impl UserAuthRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if !is_valid_username(&self.username) || self.password.len() < 6 {
            return Err(ApiError::Validation);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i64,
    pub name: String,
    pub role: String,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.username,
            role: u.role,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub id: i64,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserQuery {
    pub id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_bounds_are_enforced() {
        assert!(is_valid_username("oleg"));
        assert!(is_valid_username("user_42"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("seventeen_chars_x"));
        assert!(!is_valid_username("bad name"));
    }

    #[test]
    fn short_password_fails_validation() {
        let req = UserAuthRequest {
            username: "oleg".into(),
            password: "123".into(),
        };
        assert!(matches!(req.validate(), Err(ApiError::Validation)));
    }
}
