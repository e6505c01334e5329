//! Errors raised by the Morpho Blue API client.

use thiserror::Error;

/// Failure while fetching or decoding an API response.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL error: {}", .0.join("; "))]
    GraphQl(Vec<String>),

    #[error("GraphQL response contained no data")]
    EmptyResponse,

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Whether another attempt at the same request may succeed.
    ///
    /// Transport failures and server-side statuses are retried; GraphQL
    /// validation errors and decode failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::GraphQl(_) | Self::EmptyResponse | Self::Decode(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        let server = ApiError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(server.is_retryable());

        let throttled = ApiError::Status {
            status: 429,
            body: String::new(),
        };
        assert!(throttled.is_retryable());

        let client = ApiError::Status {
            status: 400,
            body: "bad request".to_string(),
        };
        assert!(!client.is_retryable());

        assert!(!ApiError::GraphQl(vec!["unknown field".to_string()]).is_retryable());
        assert!(!ApiError::EmptyResponse.is_retryable());
    }

    #[test]
    fn test_graphql_message_joins_errors() {
        let err = ApiError::GraphQl(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(err.to_string(), "GraphQL error: first; second");
    }
}
