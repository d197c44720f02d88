//! HTTP client for the pull API

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::message::{FeedSnapshot, Frame, FrameError, ProfileOrders};
use shared::models::Order;
use shared::response::{ApiMessage, RefreshTokenRequest, RefreshTokenResponse};

use crate::error::JWT_EXPIRED;
use crate::{ClientConfig, ClientError, ClientResult, CredentialStore};

/// Order endpoints used by the pull fallback path
#[async_trait]
pub trait OrdersApi: Send + Sync {
    /// Current feed snapshot
    async fn feeds(&self) -> ClientResult<FeedSnapshot>;

    /// The signed-in user's orders
    async fn profile_orders(&self) -> ClientResult<Vec<Order>>;

    /// Orders carrying a display number (at most one in practice)
    async fn orders_by_number(&self, number: u64) -> ClientResult<Vec<Order>>;
}

/// HTTP client for the storefront API
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    credentials: CredentialStore,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig, credentials: CredentialStore) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            credentials,
        })
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Make a GET request, optionally with an authorization header
    async fn get<T: DeserializeOwned>(&self, path: &str, auth: Option<&str>) -> ClientResult<T> {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = auth {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        let response = request.send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> ClientResult<T> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response.
    ///
    /// Every endpoint answers with a JSON object carrying `success`; failures
    /// may carry a `message`.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let body: ApiMessage = serde_json::from_str(&text).unwrap_or_default();
            let message = body.message_or(&format!("HTTP {}", status.as_u16()));
            tracing::debug!(status = status.as_u16(), message = %message, "API request failed");
            return Err(match status {
                _ if message == JWT_EXPIRED => ClientError::TokenExpired,
                StatusCode::UNAUTHORIZED => ClientError::Unauthorized,
                StatusCode::NOT_FOUND => ClientError::NotFound(message),
                _ => ClientError::Rejected(message),
            });
        }

        let value: Value = serde_json::from_str(&text)?;
        match Frame::<T>::from_value(&value) {
            Ok(Frame::Success(body)) => Ok(body),
            Ok(Frame::Failure { message }) => {
                let message = message.unwrap_or_else(|| "Request failed".to_string());
                if message == JWT_EXPIRED {
                    Err(ClientError::TokenExpired)
                } else {
                    Err(ClientError::Rejected(message))
                }
            }
            Err(FrameError::MissingSuccess) => Err(ClientError::InvalidResponse(
                "missing success flag".to_string(),
            )),
            Err(FrameError::InvalidBody(e)) => Err(ClientError::InvalidResponse(e.to_string())),
        }
    }

    // ========== Auth API ==========

    /// Exchange the stored refresh token for a new token pair and store both
    pub async fn refresh_token(&self) -> ClientResult<()> {
        let refresh = self
            .credentials
            .refresh_token()
            .ok_or(ClientError::Unauthorized)?;

        let response: RefreshTokenResponse = self
            .post("auth/token", &RefreshTokenRequest { token: refresh })
            .await?;

        self.credentials.set_refresh_token(response.refresh_token)?;
        self.credentials.set_access_token(response.access_token);
        tracing::info!("Access token refreshed");
        Ok(())
    }

    /// Current access token, refreshing first when none is held
    async fn access_token(&self) -> ClientResult<String> {
        if let Some(token) = self.credentials.access_token() {
            return Ok(token);
        }
        self.refresh_token().await?;
        self.credentials
            .access_token()
            .ok_or(ClientError::Unauthorized)
    }

    /// Authenticated GET, retried once with a fresh token on expiry
    async fn authorized_get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let token = self.access_token().await?;
        match self.get(path, Some(&token)).await {
            Err(e) if e.is_token_expired() => {
                tracing::info!(path, "Access token expired, refreshing and retrying");
                self.credentials.delete_access_token();
                let token = self.access_token().await?;
                self.get(path, Some(&token)).await
            }
            other => other,
        }
    }

    // ========== Orders API ==========

    pub async fn get_feeds(&self) -> ClientResult<FeedSnapshot> {
        self.get("orders/all", None).await
    }

    pub async fn get_profile_orders(&self) -> ClientResult<Vec<Order>> {
        let body: ProfileOrders = self.authorized_get("orders").await?;
        Ok(body.orders)
    }

    pub async fn get_order_by_number(&self, number: u64) -> ClientResult<Vec<Order>> {
        let body: ProfileOrders = self.get(&format!("orders/{}", number), None).await?;
        Ok(body.orders)
    }
}

#[async_trait]
impl OrdersApi for HttpClient {
    async fn feeds(&self) -> ClientResult<FeedSnapshot> {
        self.get_feeds().await
    }

    async fn profile_orders(&self) -> ClientResult<Vec<Order>> {
        self.get_profile_orders().await
    }

    async fn orders_by_number(&self, number: u64) -> ClientResult<Vec<Order>> {
        self.get_order_by_number(number).await
    }
}
