use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::auth::claims::{Claims, Principal, Role};
use crate::auth::repo::User;
use crate::config::JwtConfig;
use crate::error::ApiError;
use crate::state::AppState;

pub const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Token was expired")]
    Expired,
    #[error("Invalid or expired token")]
    Invalid,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig { secret, ttl_minutes, .. } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs((ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, user: &User) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.username.clone(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            id: Some(serde_json::json!(user.id)),
            role: Some(user.role.clone()),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = user.id, "jwt signed");
        Ok(token)
    }

    /// Signature and expiry check only; claim-level validation happens in
    /// `Claims::into_principal`. Expiry is reported as its own kind so the
    /// boundary can answer with a distinguishing message.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::default();
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(AuthError::Expired),
                _ => Err(AuthError::Invalid),
            },
        }
    }

    pub fn principal(&self, token: &str) -> Result<Principal, AuthError> {
        self.verify(token)?
            .into_principal()
            .ok_or(AuthError::Invalid)
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?;
    header
        .strip_prefix(BEARER_PREFIX)
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header".into()))
}

/// Requires a valid bearer token and yields the verified principal.
pub struct AuthUser(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let token = bearer_token(parts)?;
        match keys.principal(token) {
            Ok(principal) => Ok(AuthUser(principal)),
            Err(e) => {
                warn!("rejected token: {e}");
                Err(ApiError::Unauthorized(e.to_string()))
            }
        }
    }
}

/// Whether `X-User-Id`/`X-User-Role` count as verified identity. Resolved
/// from config so it can only be switched on deliberately, for deployments
/// where a gateway strips these headers from inbound traffic and injects
/// them from a token it verified itself.
#[derive(Debug, Clone, Copy)]
pub struct ForwardedTrust(pub bool);

impl FromRef<AppState> for ForwardedTrust {
    fn from_ref(state: &AppState) -> Self {
        ForwardedTrust(state.config.jwt.trust_forwarded)
    }
}

/// Identity for owner-scoped routes. Forwarded identity headers are ignored
/// unless `ForwardedTrust` says otherwise; anything a client can set itself
/// must never establish a principal, so the default path always verifies
/// the bearer token.
#[derive(Debug)]
pub struct Identity(pub Principal);

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
    ForwardedTrust: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ForwardedTrust(trusted) = ForwardedTrust::from_ref(state);
        if trusted {
            let forwarded_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok());
            let forwarded_role = parts
                .headers
                .get("X-User-Role")
                .and_then(|v| v.to_str().ok())
                .and_then(Role::parse);
            if let (Some(id), Some(role)) = (forwarded_id, forwarded_role) {
                return Ok(Identity(Principal { id, role }));
            }
        }
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        Ok(Identity(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    fn user(id: i64, role: &str) -> User {
        User {
            id,
            username: format!("user{id}"),
            password_hash: String::new(),
            role: role.into(),
        }
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let token = keys.sign(&user(7, "MODERATOR")).expect("sign");
        let principal = keys.principal(&token).expect("verify");
        assert_eq!(principal.id, 7);
        assert_eq!(principal.role, Role::Moderator);
    }

    #[tokio::test]
    async fn expired_token_is_a_distinct_error() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: "old".into(),
            iat: now - 7200,
            exp: now - 3600,
            id: Some(serde_json::json!(1)),
            role: Some("USER".into()),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert_eq!(keys.verify(&token).unwrap_err(), AuthError::Expired);
    }

    #[tokio::test]
    async fn tampered_token_is_invalid_not_expired() {
        let keys = make_keys();
        let mut token = keys.sign(&user(1, "USER")).unwrap();
        token.push('x');
        assert_eq!(keys.verify(&token).unwrap_err(), AuthError::Invalid);
    }

    #[tokio::test]
    async fn token_without_role_claim_is_rejected() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: "roleless".into(),
            iat: now,
            exp: now + 3600,
            id: Some(serde_json::json!(1)),
            role: None,
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert_eq!(keys.principal(&token).unwrap_err(), AuthError::Invalid);
    }

    fn parts_without_auth(forged: bool) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/menu");
        if forged {
            builder = builder.header("X-User-Id", "1").header("X-User-Role", "ADMIN");
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn forwarded_headers_cannot_establish_identity_by_default() {
        let state = AppState::fake();
        let mut parts = parts_without_auth(true);
        let err = Identity::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn missing_authorization_header_is_unauthorized() {
        let state = AppState::fake();
        let mut parts = parts_without_auth(false);
        let err = Identity::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn forwarded_headers_are_used_only_with_gateway_trust() {
        let base = AppState::fake();
        let mut config = (*base.config).clone();
        config.jwt.trust_forwarded = true;
        let state = AppState::from_parts(
            base.db.clone(),
            std::sync::Arc::new(config),
            base.dishes.clone(),
            base.users.clone(),
            base.events.clone(),
            base.files.clone(),
        );
        let mut parts = parts_without_auth(true);
        let Identity(principal) = Identity::from_request_parts(&mut parts, &state)
            .await
            .expect("trusted gateway identity");
        assert_eq!(principal, Principal { id: 1, role: Role::Admin });
    }

    #[tokio::test]
    async fn token_with_non_integer_id_is_rejected() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = Claims {
            sub: "weird".into(),
            iat: now,
            exp: now + 3600,
            id: Some(serde_json::json!("abc")),
            role: Some("USER".into()),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).unwrap();
        assert_eq!(keys.principal(&token).unwrap_err(), AuthError::Invalid);
    }
}
