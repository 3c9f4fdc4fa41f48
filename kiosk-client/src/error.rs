//! Client error types

use thiserror::Error;

/// Errors surfaced by the order and robot-position REST calls
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 401 — token missing or rejected
    #[error("Authentication required")]
    Unauthorized,

    /// 403
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// 400
    #[error("Validation error: {0}")]
    Validation(String),

    /// Any other non-2xx status
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for REST client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Gateway channel error type
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Connection attempt failed
    #[error("Gateway connection error: {0}")]
    Connect(String),

    /// Channel has been closed by `Gateway::close`
    #[error("Gateway closed")]
    Closed,

    /// Protocol-level failure on an established connection
    #[error("Gateway protocol error: {0}")]
    Protocol(String),
}
