//! Error taxonomy shared by the remote adapters and the driver.

use thiserror::Error;

use crate::{ItemId, MediaId, PropertyId};

/// Coarse classification deciding how a failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Malformed reference, property or value. Never retried.
    InvalidInput,
    /// Timeouts, overload and gateway errors. Retried with backoff.
    Transient,
    /// Subject or category does not exist remotely. Never retried.
    NotFound,
    /// Rejected credentials or tokens. Never retried.
    AuthFailure,
    /// Any other failure for the current operation.
    Fatal,
}

/// Failure raised by a remote read, lookup or write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Input rejected before any remote call.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the rejected input.
        message: String,
    },
    /// The entity does not exist remotely.
    #[error("{entity} does not exist")]
    NotFound {
        /// Identifier or title that was looked up.
        entity: String,
    },
    /// Credentials, session or token rejected by the service.
    #[error("authorisation failed ({code}): {info}")]
    AuthFailure {
        /// API error code or HTTP status.
        code: String,
        /// Message returned by the service.
        info: String,
    },
    /// A retryable condition reported by the service.
    #[error("transient failure ({code}): {info}")]
    Transient {
        /// API error code.
        code: String,
        /// Message returned by the service.
        info: String,
    },
    /// Every attempt failed with a retryable condition.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Failure observed on the final attempt.
        last: Box<SyncError>,
    },
    /// Structured API error that is not retryable.
    #[error("remote error ({code}): {info}")]
    Remote {
        /// API error code.
        code: String,
        /// Message returned by the service.
        info: String,
    },
    /// Unexpected HTTP status.
    #[error("HTTP {status} from {url}")]
    Http {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// Connection failure or timeout.
    #[error("network error for {url}: {message}")]
    Network {
        /// Request URL.
        url: String,
        /// Underlying error message.
        message: String,
    },
    /// Response did not have the expected shape.
    #[error("unexpected response while {context}: {message}")]
    Decode {
        /// Operation being performed.
        context: String,
        /// Description of the mismatch.
        message: String,
    },
    /// A write was attempted without an edit token.
    #[error("no edit token available; writes are disabled for this session")]
    MissingEditToken,
}

impl SyncError {
    /// Place the error in the handling taxonomy.
    ///
    /// # Examples
    /// ```
    /// use sdc_core::{ErrorClass, SyncError};
    ///
    /// let err = SyncError::Http { url: "https://example.org".into(), status: 503 };
    /// assert_eq!(err.class(), ErrorClass::Transient);
    /// ```
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidInput { .. } => ErrorClass::InvalidInput,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::AuthFailure { .. } | Self::MissingEditToken => ErrorClass::AuthFailure,
            Self::Transient { .. } | Self::Network { .. } | Self::RetriesExhausted { .. } => {
                ErrorClass::Transient
            }
            Self::Http { status, .. } => match status {
                429 | 500 | 502 | 503 | 504 => ErrorClass::Transient,
                401 | 403 => ErrorClass::AuthFailure,
                404 => ErrorClass::NotFound,
                _ => ErrorClass::Fatal,
            },
            Self::Remote { .. } | Self::Decode { .. } => ErrorClass::Fatal,
        }
    }

    /// Whether another attempt could succeed.
    ///
    /// Exhausted retries are classed as transient but are not retried again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.class() == ErrorClass::Transient && !matches!(self, Self::RetriesExhausted { .. })
    }

    /// Helper for shape mismatches in responses.
    #[must_use]
    pub fn decode(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.into(),
        }
    }
}

/// Step of a claim write that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// Reading the current claims; nothing was sent to be changed.
    Read,
    /// The mutating call itself.
    Create,
}

/// A failed claim write with the triple that was being written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to add {value} to {property} on {subject}: {source}")]
pub struct ClaimWriteError {
    /// Target subject.
    pub subject: MediaId,
    /// Target property.
    pub property: PropertyId,
    /// Value being written.
    pub value: ItemId,
    /// Step that failed.
    pub stage: WriteStage,
    /// Underlying failure.
    #[source]
    pub source: SyncError,
}
