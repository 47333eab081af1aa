use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ApiError;

/// Dish representation served by the dish tier, nutrition already aggregated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDish {
    pub id: i64,
    pub name: String,
    pub calories: i32,
    pub carbs: i32,
    pub protein: i32,
    pub fats: i32,
}

impl RemoteDish {
    /// Zero-valued stand-in used when a referenced dish no longer exists.
    pub fn not_found(id: i64) -> Self {
        Self {
            id,
            name: "(not found)".into(),
            calories: 0,
            carbs: 0,
            protein: 0,
            fats: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: i64,
    pub name: String,
}

/// Every remote failure a caller can see. `Transport` only escapes the raw
/// HTTP clients; the `Fallback` decorator rewrites it to `Unavailable`
/// before it reaches the service layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Transport(String),
    #[error("remote call failed with status {0}")]
    Other(u16),
}

impl From<ClientError> for ApiError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::NotFound(m) => ApiError::NotFound(m),
            ClientError::Forbidden(m) => ApiError::Forbidden(m),
            ClientError::Unavailable(m) => ApiError::Unavailable(m),
            ClientError::Transport(m) => ApiError::Unavailable(m),
            ClientError::Other(s) => ApiError::Internal(format!("remote call failed with status {s}")),
        }
    }
}

#[async_trait]
pub trait DishClient: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<RemoteDish, ClientError>;
}

#[async_trait]
pub trait UserClient: Send + Sync {
    /// The caller's Authorization header is forwarded as-is; the user tier
    /// does its own verification.
    async fn get_by_name(&self, auth_header: &str, name: &str) -> Result<RemoteUser, ClientError>;
}

fn status_error(status: reqwest::StatusCode, what: &str) -> ClientError {
    match status.as_u16() {
        404 => ClientError::NotFound(format!("{what} was not found")),
        403 => ClientError::Forbidden("FORBIDDEN".into()),
        503 => ClientError::Unavailable(format!("{what} service unavailable")),
        other => ClientError::Other(other),
    }
}

fn transport_error(e: reqwest::Error) -> ClientError {
    ClientError::Transport(e.to_string())
}

pub struct HttpDishClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDishClient {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl DishClient for HttpDishClient {
    async fn get_by_id(&self, id: i64) -> Result<RemoteDish, ClientError> {
        let resp = self
            .http
            .get(format!("{}/dish", self.base_url))
            .query(&[("id", id)])
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            return Err(status_error(resp.status(), "Dish"));
        }
        resp.json::<RemoteDish>().await.map_err(transport_error)
    }
}

pub struct HttpUserClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpUserClient {
    pub fn new(base_url: &str, timeout: std::time::Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl UserClient for HttpUserClient {
    async fn get_by_name(&self, auth_header: &str, name: &str) -> Result<RemoteUser, ClientError> {
        let resp = self
            .http
            .get(format!("{}/user", self.base_url))
            .header(reqwest::header::AUTHORIZATION, auth_header)
            .query(&[("name", name)])
            .send()
            .await
            .map_err(transport_error)?;
        if !resp.status().is_success() {
            return Err(status_error(resp.status(), "User"));
        }
        resp.json::<RemoteUser>().await.map_err(transport_error)
    }
}

/// Decorator that keeps hard transport failures (connection refused,
/// timeout, undecodable body) from leaking to callers: they become
/// `Unavailable` with a message naming the unreachable service.
pub struct Fallback<C> {
    inner: C,
    service: &'static str,
}

impl<C> Fallback<C> {
    pub fn new(inner: C, service: &'static str) -> Self {
        Self { inner, service }
    }

    fn map_err(&self, e: ClientError) -> ClientError {
        match e {
            ClientError::Transport(detail) => {
                warn!(service = self.service, %detail, "remote call failed at transport level");
                ClientError::Unavailable(format!("{} is unavailable now", self.service))
            }
            other => other,
        }
    }
}

#[async_trait]
impl<C: DishClient> DishClient for Fallback<C> {
    async fn get_by_id(&self, id: i64) -> Result<RemoteDish, ClientError> {
        self.inner.get_by_id(id).await.map_err(|e| self.map_err(e))
    }
}

#[async_trait]
impl<C: UserClient> UserClient for Fallback<C> {
    async fn get_by_name(&self, auth_header: &str, name: &str) -> Result<RemoteUser, ClientError> {
        self.inner
            .get_by_name(auth_header, name)
            .await
            .map_err(|e| self.map_err(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingDishes(ClientError);

    #[async_trait]
    impl DishClient for FailingDishes {
        async fn get_by_id(&self, _id: i64) -> Result<RemoteDish, ClientError> {
            Err(self.0.clone())
        }
    }

    #[tokio::test]
    async fn transport_failures_become_unavailable() {
        let client = Fallback::new(
            FailingDishes(ClientError::Transport("connection refused".into())),
            "Dish Service",
        );
        let err = client.get_by_id(1).await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Unavailable("Dish Service is unavailable now".into())
        );
    }

    #[tokio::test]
    async fn decoded_errors_pass_through_unchanged() {
        let client = Fallback::new(
            FailingDishes(ClientError::NotFound("Dish was not found".into())),
            "Dish Service",
        );
        let err = client.get_by_id(1).await.unwrap_err();
        assert_eq!(err, ClientError::NotFound("Dish was not found".into()));
    }

    #[test]
    fn statuses_map_to_exactly_one_kind() {
        assert!(matches!(
            status_error(reqwest::StatusCode::NOT_FOUND, "Dish"),
            ClientError::NotFound(_)
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::FORBIDDEN, "Dish"),
            ClientError::Forbidden(_)
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, "Dish"),
            ClientError::Unavailable(_)
        ));
        assert!(matches!(
            status_error(reqwest::StatusCode::BAD_GATEWAY, "Dish"),
            ClientError::Other(502)
        ));
    }

    #[test]
    fn placeholder_dish_is_zero_valued() {
        let d = RemoteDish::not_found(7);
        assert_eq!(d.name, "(not found)");
        assert_eq!((d.calories, d.carbs, d.protein, d.fats), (0, 0, 0, 0));
    }
}
