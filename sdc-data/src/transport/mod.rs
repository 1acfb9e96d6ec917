//! Resilient access to the MediaWiki action API.
//!
//! Requests are plain [`ApiRequest`] values executed by an [`ApiBackend`].
//! [`ResilientTransport`] sits on top and retries transient failures with
//! exponential backoff, turning API `error` objects into
//! [`sdc_core::SyncError`] values on the way.
//!
//! # Example
//!
//! ```no_run
//! use sdc_data::transport::{ApiRequest, Endpoint, ResilientTransport, TransportConfig};
//!
//! let config = TransportConfig::new("sdc-sync/0.1 (ops@example.org)");
//! let transport = ResilientTransport::connect(&config)?;
//! let body = transport.send(
//!     &ApiRequest::read(Endpoint::Commons, "wbgetentities").param("ids", "M12345"),
//! )?;
//! # let _ = body;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod backend;
mod http;
mod request;
mod retry;

#[doc(hidden)]
pub mod test_support;

pub use backend::{ApiBackend, TransportError};
pub use http::{
    DEFAULT_COMMONS_API, DEFAULT_MAXLAG, DEFAULT_TIMEOUT_SECS, DEFAULT_WIKIDATA_API, HttpBackend,
    TransportBuildError, TransportConfig,
};
pub use request::{ApiRequest, Endpoint, Method};
pub use retry::{DEFAULT_MAX_ATTEMPTS, ResilientTransport, RetryPolicy};
