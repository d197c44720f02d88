//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::stream::StreamKind;

/// Default pull API base URL
pub const DEFAULT_API_URL: &str = "https://norma.education-services.ru/api";

/// Default push-stream base URL
pub const DEFAULT_WS_URL: &str = "wss://norma.education-services.ru";

/// Client configuration for talking to the storefront backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Pull API base URL (e.g., "https://host/api")
    pub api_url: String,

    /// Push-stream base URL (e.g., "wss://host")
    pub ws_url: String,

    /// Path of the global feed stream
    pub feed_path: String,

    /// Path of the per-user orders stream
    pub profile_orders_path: String,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Access token lifetime
    pub access_token_lifetime: Duration,

    /// File holding the refresh token and other durable client state.
    /// `None` keeps everything in memory.
    pub storage_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Create a new configuration for the given API and stream base URLs
    pub fn new(api_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ws_url: ws_url.into(),
            feed_path: "/orders/all".to_string(),
            profile_orders_path: "/orders".to_string(),
            timeout: 30,
            access_token_lifetime: Duration::from_secs(20 * 60),
            storage_path: None,
        }
    }

    /// Build a configuration from `BURGER_*` environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();

        let mut config = Self::default();
        if let Ok(url) = std::env::var("BURGER_API_URL") {
            config.api_url = url;
        }
        if let Ok(url) = std::env::var("BURGER_WS_URL") {
            config.ws_url = url;
        }
        if let Ok(path) = std::env::var("BURGER_STORAGE_PATH") {
            config.storage_path = Some(PathBuf::from(path));
        }
        if let Ok(secs) = std::env::var("BURGER_HTTP_TIMEOUT_SECS") {
            match secs.parse() {
                Ok(secs) => config.timeout = secs,
                Err(e) => tracing::warn!(value = %secs, "Ignoring invalid BURGER_HTTP_TIMEOUT_SECS: {}", e),
            }
        }
        config
    }

    /// Set the feed stream path
    pub fn with_feed_path(mut self, path: impl Into<String>) -> Self {
        self.feed_path = path.into();
        self
    }

    /// Set the per-user orders stream path
    pub fn with_profile_orders_path(mut self, path: impl Into<String>) -> Self {
        self.profile_orders_path = path.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the access token lifetime
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Persist durable credentials to the given file
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Full push-stream address for a stream kind, without authentication
    pub fn stream_url(&self, kind: StreamKind) -> String {
        let path = match kind {
            StreamKind::Feed => &self.feed_path,
            StreamKind::ProfileOrders => &self.profile_orders_path,
        };
        format!("{}{}", self.ws_url.trim_end_matches('/'), path)
    }

    /// Create an HTTP client from this configuration
    pub fn build_http_client(
        &self,
        credentials: crate::CredentialStore,
    ) -> crate::ClientResult<crate::HttpClient> {
        crate::HttpClient::new(self, credentials)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_WS_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_urls() {
        let config = ClientConfig::new("http://localhost:3000/api", "ws://localhost:3000/");
        assert_eq!(
            config.stream_url(StreamKind::Feed),
            "ws://localhost:3000/orders/all"
        );
        assert_eq!(
            config.stream_url(StreamKind::ProfileOrders),
            "ws://localhost:3000/orders"
        );
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::default()
            .with_timeout(5)
            .with_feed_path("/feed")
            .with_storage_path("/tmp/burger.json");

        assert_eq!(config.timeout, 5);
        assert_eq!(config.feed_path, "/feed");
        assert_eq!(config.access_token_lifetime, Duration::from_secs(1200));
        assert!(config.storage_path.is_some());
    }
}
