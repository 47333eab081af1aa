use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
    /// Accept `X-User-Id`/`X-User-Role` as a verified identity. Only safe
    /// when a gateway strips these headers from inbound traffic and injects
    /// them from a token it verified itself; off by default.
    pub trust_forwarded: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagingConfig {
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl PagingConfig {
    /// Resolve raw query params into (page number, page size): missing number
    /// defaults to 0, missing size to the configured default, and an oversized
    /// size is silently clamped to the configured maximum.
    pub fn resolve(&self, pnumber: Option<i64>, psize: Option<i64>) -> (i64, i64) {
        let page = pnumber.unwrap_or(0).max(0);
        let size = match psize {
            Some(s) => s.clamp(1, self.max_page_size),
            None => self.default_page_size,
        };
        (page, size)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub dish_service_url: String,
    pub user_service_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Base URL of the event broker's HTTP ingest; unset means events are
    /// only logged.
    pub broker_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory for uploaded file bodies; created on first write.
    pub upload_dir: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub paging: PagingConfig,
    pub clients: ClientConfig,
    pub events: EventsConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            trust_forwarded: std::env::var("TRUST_FORWARDED_HEADERS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };
        let paging = PagingConfig {
            default_page_size: std::env::var("APP_DEFAULT_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(50),
            max_page_size: std::env::var("APP_MAX_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(100),
        };
        let clients = ClientConfig {
            dish_service_url: std::env::var("DISH_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            user_service_url: std::env::var("USER_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            timeout_secs: std::env::var("CLIENT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5),
        };
        let events = EventsConfig {
            broker_url: std::env::var("EVENT_BROKER_URL")
                .ok()
                .filter(|v| !v.is_empty()),
        };
        let storage = StorageConfig {
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".into()),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(10 * 1024 * 1024),
        };
        Ok(Self {
            database_url,
            jwt,
            paging,
            clients,
            events,
            storage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paging() -> PagingConfig {
        PagingConfig {
            default_page_size: 50,
            max_page_size: 100,
        }
    }

    #[test]
    fn missing_params_use_defaults() {
        assert_eq!(paging().resolve(None, None), (0, 50));
    }

    #[test]
    fn oversized_page_is_clamped_to_max() {
        assert_eq!(paging().resolve(Some(2), Some(500)), (2, 100));
    }

    #[test]
    fn in_range_params_pass_through() {
        assert_eq!(paging().resolve(Some(3), Some(10)), (3, 10));
    }
}
