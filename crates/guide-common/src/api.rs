/// HTTP client for the remote guide catalog and the profile/favorites service.
///
/// Every request carries a fixed timeout and, when a session exists, a bearer credential.
/// Profile calls without a session fail fast with `ApiError::NoSession` instead of going out
/// anonymously. There is no retry: callers degrade instead.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::model::{Guide, GuideQuery, Library, SettingsPatch, UserProfile};
use crate::session::SessionStore;

#[derive(Clone, Debug)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl ApiClientConfig {
    /// Optional:
    /// - `GUIDE_API_BASE_URL` (default: "https://localhost:7253")
    /// - `GUIDE_API_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Self {
        let base_url = std::env::var("GUIDE_API_BASE_URL")
            .unwrap_or_else(|_| "https://localhost:7253".to_string());

        let timeout = std::env::var("GUIDE_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(10));

        Self::new(base_url, timeout)
    }

    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            max_error_body_bytes: 8 * 1024,
        }
    }
}

/// Read and write access to the remote guide catalog.
#[async_trait]
pub trait GuideCatalog: Send + Sync {
    async fn list_guides(&self, query: &GuideQuery) -> Result<Vec<Guide>, ApiError>;

    async fn get_guide(
        &self,
        base_id: &str,
        lang: Option<&str>,
        device: Option<&str>,
    ) -> Result<Guide, ApiError>;

    async fn get_guides_batch(&self, ids: &[String]) -> Result<Vec<Guide>, ApiError>;

    async fn create_guide(&self, guide: &Guide) -> Result<Guide, ApiError>;

    async fn update_guide(&self, id: &str, guide: &Guide) -> Result<Guide, ApiError>;

    async fn delete_guide(&self, id: &str) -> Result<(), ApiError>;
}

/// Per-user profile, settings and favorites.
#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn get_me(&self) -> Result<UserProfile, ApiError>;

    async fn patch_settings(&self, patch: &SettingsPatch) -> Result<UserProfile, ApiError>;

    /// Replaces the remote favorites record with `ids`.
    async fn sync_favorites(&self, ids: &[String]) -> Result<(), ApiError>;

    async fn get_library(&self, limit: u32, offset: u32) -> Result<Library, ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    config: ApiClientConfig,
    http: reqwest::Client,
    sessions: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig, sessions: Arc<SessionStore>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent("guide-helper")
            .build()?;
        Ok(Self {
            config,
            http,
            sessions,
        })
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url, path);
        debug!(%method, url, "api request");
        let mut builder = self.http.request(method, url).timeout(self.config.timeout);
        if let Some(token) = self.sessions.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn authed_request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        if !self.sessions.is_signed_in() {
            return Err(ApiError::NoSession);
        }
        Ok(self.request(method, path))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(to_status_error(resp, self.config.max_error_body_bytes).await);
        }
        Ok(resp.json::<T>().await?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        let resp = builder.send().await?;
        if !resp.status().is_success() {
            return Err(to_status_error(resp, self.config.max_error_body_bytes).await);
        }
        Ok(())
    }
}

#[async_trait]
impl GuideCatalog for ApiClient {
    async fn list_guides(&self, query: &GuideQuery) -> Result<Vec<Guide>, ApiError> {
        self.send_json(self.request(Method::GET, "/guides").query(query))
            .await
    }

    async fn get_guide(
        &self,
        base_id: &str,
        lang: Option<&str>,
        device: Option<&str>,
    ) -> Result<Guide, ApiError> {
        let query = GuideQuery {
            lang: lang.map(str::to_string),
            device: device.map(str::to_string),
            ..Default::default()
        };
        let path = guide_path(base_id);
        self.send_json(self.request(Method::GET, &path).query(&query))
            .await
    }

    async fn get_guides_batch(&self, ids: &[String]) -> Result<Vec<Guide>, ApiError> {
        self.send_json(self.request(Method::POST, "/guides/batch").json(ids))
            .await
    }

    async fn create_guide(&self, guide: &Guide) -> Result<Guide, ApiError> {
        let builder = self.authed_request(Method::POST, "/guides")?.json(guide);
        self.send_json(builder).await
    }

    async fn update_guide(&self, id: &str, guide: &Guide) -> Result<Guide, ApiError> {
        let path = guide_path(id);
        let builder = self.authed_request(Method::PUT, &path)?.json(guide);
        self.send_json(builder).await
    }

    async fn delete_guide(&self, id: &str) -> Result<(), ApiError> {
        let path = guide_path(id);
        let builder = self.authed_request(Method::DELETE, &path)?;
        self.send_empty(builder).await
    }
}

#[async_trait]
impl ProfileService for ApiClient {
    async fn get_me(&self) -> Result<UserProfile, ApiError> {
        let builder = self.authed_request(Method::GET, "/me")?;
        self.send_json(builder).await
    }

    async fn patch_settings(&self, patch: &SettingsPatch) -> Result<UserProfile, ApiError> {
        let builder = self.authed_request(Method::PATCH, "/me/settings")?.json(patch);
        self.send_json(builder).await
    }

    async fn sync_favorites(&self, ids: &[String]) -> Result<(), ApiError> {
        let builder = self.authed_request(Method::POST, "/me/favorites")?.json(ids);
        self.send_empty(builder).await
    }

    async fn get_library(&self, limit: u32, offset: u32) -> Result<Library, ApiError> {
        let builder = self
            .authed_request(Method::GET, "/me/library")?
            .query(&[("limit", limit), ("offset", offset)]);
        self.send_json(builder).await
    }
}

/// Ids are a single path segment; `/` and other reserved characters are escaped.
fn guide_path(id: &str) -> String {
    format!("/guides/{}", urlencoding::encode(id))
}

async fn to_status_error(resp: reqwest::Response, max_error_body_bytes: usize) -> ApiError {
    let status = resp.status();
    let body = read_limited_text(resp, max_error_body_bytes).await;
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        body
    };
    ApiError::Status { status, message }
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read api error body");
            "<failed to read error body>".to_string()
        }
    }
}
