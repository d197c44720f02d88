//! Client error types

use thiserror::Error;

/// Message the API answers with when the access token has expired
pub const JWT_EXPIRED: &str = "jwt expired";

/// Pull API error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Authentication required (no usable access or refresh token)
    #[error("Authentication required")]
    Unauthorized,

    /// Access token rejected as expired
    #[error("Token expired")]
    TokenExpired,

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server answered with `success: false`
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credential persistence failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ClientError {
    /// Text suitable for state and display: the server's own message when
    /// it sent one, otherwise the error description
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Rejected(message) | ClientError::NotFound(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether the server rejected the access token as expired
    pub fn is_token_expired(&self) -> bool {
        match self {
            ClientError::TokenExpired => true,
            ClientError::Rejected(message) => message == JWT_EXPIRED,
            _ => false,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Durable credential storage error
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Push-stream error type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StreamError {
    /// The target address could not be turned into a connect request
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The socket could not be opened
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Socket-level failure on an open connection
    #[error("Transport error: {0}")]
    Transport(String),
}
