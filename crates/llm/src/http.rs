//! Mapping of HTTP transport outcomes onto provider failure kinds.
//!
//! Shared by every reqwest-backed provider (generation here, embeddings in
//! `docsmith-knowledge`).

use docsmith_core::{AppError, ProviderFailure};
use reqwest::StatusCode;

/// Classify a transport-level error.
pub fn classify_error(err: &reqwest::Error) -> ProviderFailure {
    if err.is_timeout() {
        ProviderFailure::Timeout
    } else if let Some(status) = err.status() {
        classify_status(status)
    } else {
        ProviderFailure::Unavailable
    }
}

/// Classify a non-success HTTP status.
///
/// Client errors mean the backend rejected the request; everything else is
/// treated as the backend being unavailable.
pub fn classify_status(status: StatusCode) -> ProviderFailure {
    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        ProviderFailure::Timeout
    } else if status.is_client_error() {
        ProviderFailure::Refused
    } else {
        ProviderFailure::Unavailable
    }
}

/// Build a provider error from a transport error.
pub fn transport_error(provider: &str, err: reqwest::Error) -> AppError {
    let kind = classify_error(&err);
    AppError::provider(kind, format!("{} request failed: {}", provider, err))
}

/// Build a provider error from a non-success response.
pub async fn status_error(provider: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    AppError::provider(
        classify_status(status),
        format!("{} API error ({}): {}", provider, status, body.trim()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST),
            ProviderFailure::Refused
        );
        assert_eq!(classify_status(StatusCode::NOT_FOUND), ProviderFailure::Refused);
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            ProviderFailure::Unavailable
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            ProviderFailure::Unavailable
        );
        assert_eq!(
            classify_status(StatusCode::GATEWAY_TIMEOUT),
            ProviderFailure::Timeout
        );
    }
}
