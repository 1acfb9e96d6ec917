//! The raw request executor beneath the retry layer.

use sdc_core::SyncError;
use serde_json::Value;
use thiserror::Error;

use super::ApiRequest;

/// Failure to obtain a JSON document from the API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Http {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// No response arrived within the timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Request URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// Connection could not be established or was reset.
    #[error("network error for {url}: {message}")]
    Network {
        /// Request URL.
        url: String,
        /// Underlying error message.
        message: String,
    },
    /// The body was not valid JSON.
    #[error("invalid JSON from {url}: {message}")]
    Decode {
        /// Request URL.
        url: String,
        /// Parser message.
        message: String,
    },
}

impl From<TransportError> for SyncError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Http { url, status } => Self::Http { url, status },
            TransportError::Timeout { url, timeout_secs } => Self::Network {
                url,
                message: format!("timed out after {timeout_secs}s"),
            },
            TransportError::Network { url, message } => Self::Network { url, message },
            TransportError::Decode { url, message } => Self::Decode {
                context: format!("decoding response from {url}"),
                message,
            },
        }
    }
}

/// Executes a single request with no retry logic.
///
/// Implementations return the decoded JSON body for any 2xx response,
/// including bodies carrying an API `error` object; classifying those is the
/// job of [`super::ResilientTransport`].
pub trait ApiBackend {
    /// Perform one round trip.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] for HTTP, network and decoding failures.
    fn execute(&self, request: &ApiRequest) -> Result<Value, TransportError>;
}

impl<B: ApiBackend + ?Sized> ApiBackend for &B {
    fn execute(&self, request: &ApiRequest) -> Result<Value, TransportError> {
        (**self).execute(request)
    }
}
