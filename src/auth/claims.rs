use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Authorization tier carried in the token's `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    /// ADMIN and MODERATOR bypass owner-scoped checks.
    pub fn is_elevated(self) -> bool {
        matches!(self, Role::Admin | Role::Moderator)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Moderator => "MODERATOR",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "USER" => Some(Role::User),
            "MODERATOR" => Some(Role::Moderator),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Raw JWT payload. `id` and `role` are validated by `into_principal`, not
/// by serde, so a structurally valid token with bad claims still decodes
/// and is then rejected deliberately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Authenticated identity for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
}

impl Principal {
    pub fn ensure_elevated(&self) -> Result<(), ApiError> {
        if self.role.is_elevated() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "ADMIN or MODERATOR role required".into(),
            ))
        }
    }
}

impl Claims {
    /// Fail closed: a token without a role claim, or whose id claim does not
    /// parse as an integer, is invalid even when the signature checks out.
    pub fn into_principal(self) -> Option<Principal> {
        let id = match self.id? {
            serde_json::Value::Number(n) => n.as_i64()?,
            serde_json::Value::String(s) => s.parse::<i64>().ok()?,
            _ => return None,
        };
        let role = Role::parse(self.role?.as_str())?;
        Some(Principal { id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(id: serde_json::Value, role: Option<&str>) -> Claims {
        Claims {
            sub: "oleg".into(),
            exp: 2_000_000_000,
            iat: 1_000_000_000,
            id: Some(id),
            role: role.map(|r| r.to_string()),
        }
    }

    #[test]
    fn numeric_and_stringified_ids_both_parse() {
        assert_eq!(
            claims(json!(42), Some("USER")).into_principal(),
            Some(Principal { id: 42, role: Role::User })
        );
        assert_eq!(
            claims(json!("42"), Some("ADMIN")).into_principal(),
            Some(Principal { id: 42, role: Role::Admin })
        );
    }

    #[test]
    fn non_integer_id_is_rejected() {
        assert!(claims(json!("not-a-number"), Some("USER"))
            .into_principal()
            .is_none());
    }

    #[test]
    fn absent_role_fails_closed() {
        assert!(claims(json!(42), None).into_principal().is_none());
    }

    #[test]
    fn unknown_role_fails_closed() {
        assert!(claims(json!(42), Some("ROOT")).into_principal().is_none());
    }

    #[test]
    fn elevation_set_is_admin_and_moderator() {
        assert!(Role::Admin.is_elevated());
        assert!(Role::Moderator.is_elevated());
        assert!(!Role::User.is_elevated());
    }

    #[test]
    fn authenticated_but_unelevated_principal_gets_forbidden() {
        let principal = Principal { id: 1, role: Role::User };
        let err = principal.ensure_elevated().unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }
}
