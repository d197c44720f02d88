//! Pull API request/response bodies
//!
//! Order list endpoints answer with the same shapes as the push frames
//! (see [`crate::message`]); this module holds the remaining auth bodies.

use serde::{Deserialize, Serialize};

/// Body of `POST /auth/token`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub token: String,
}

/// Successful answer of `POST /auth/token`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub success: bool,
    /// Access token, usually prefixed with `Bearer `
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// Error body returned by the API on failure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiMessage {
    /// Server message, or `fallback` when the body carried none
    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}
