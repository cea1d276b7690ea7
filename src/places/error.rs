//! Error types for the Google Places client.

use thiserror::Error;

use crate::http_client::HttpClientError;

/// Errors returned by [`super::PlacesClient`].
///
/// URLs carried in variants are redacted; the API key never appears.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// No API key was configured.
    #[error(
        "Google Places API key is missing\n  Suggestion: export GOOGLE_PLACES_API_KEY or pass --api-key"
    )]
    MissingApiKey,

    /// Could not construct the HTTP client.
    #[error(transparent)]
    Client(#[from] HttpClientError),

    /// Network failure reaching the API.
    #[error("network error calling {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-2xx HTTP status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Response body was not the expected JSON.
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },

    /// `OVER_QUERY_LIMIT`.
    #[error("Google Places quota exceeded (OVER_QUERY_LIMIT)")]
    RateLimited,

    /// `REQUEST_DENIED`, typically a bad key or disabled API.
    #[error("Google Places request denied: {0}")]
    Denied(String),

    /// `INVALID_REQUEST`, also returned for page tokens that are not active yet.
    #[error("Google Places rejected the request as invalid")]
    InvalidRequest,

    /// Any other non-OK status (`UNKNOWN_ERROR`, `NOT_FOUND`, ...).
    #[error("Google Places returned status {status}: {message}")]
    Api { status: String, message: String },
}

impl PlacesError {
    /// Maps a non-success Google `status` string onto an error.
    pub(crate) fn from_status(status: &str, error_message: Option<String>) -> Self {
        match status {
            "OVER_QUERY_LIMIT" => Self::RateLimited,
            "REQUEST_DENIED" => {
                Self::Denied(error_message.unwrap_or_else(|| "no reason given".to_string()))
            }
            "INVALID_REQUEST" => Self::InvalidRequest,
            other => Self::Api {
                status: other.to_string(),
                message: error_message.unwrap_or_default(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            PlacesError::from_status("OVER_QUERY_LIMIT", None),
            PlacesError::RateLimited
        ));
        assert!(matches!(
            PlacesError::from_status("INVALID_REQUEST", None),
            PlacesError::InvalidRequest
        ));
        match PlacesError::from_status("REQUEST_DENIED", Some("API key invalid".into())) {
            PlacesError::Denied(msg) => assert_eq!(msg, "API key invalid"),
            other => panic!("unexpected {other:?}"),
        }
        match PlacesError::from_status("UNKNOWN_ERROR", None) {
            PlacesError::Api { status, .. } => assert_eq!(status, "UNKNOWN_ERROR"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_key_message_has_suggestion() {
        let msg = PlacesError::MissingApiKey.to_string();
        assert!(msg.contains("GOOGLE_PLACES_API_KEY"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PlacesError>();
    }
}
