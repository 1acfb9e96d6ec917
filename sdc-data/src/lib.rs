//! Remote adapters for the Commons structured-data synchroniser.
//!
//! Responsibilities:
//! - Send MediaWiki API requests with retry, backoff and `maxlag`.
//! - Keep the login session and edit token for a run.
//! - Implement the `sdc-core` access traits for Commons and Wikidata.
//!
//! Boundaries:
//! - Do not encode sync rules (they live in `sdc-core`).
//! - Stay synchronous at the API surface; async I/O is confined to
//!   [`transport::HttpBackend`].
//!
//! Invariants:
//! - Every request carries the configured user agent.
//! - No global mutable state.

pub mod commons;
pub mod session;
pub mod transport;
pub mod wikidata;

pub use commons::CommonsClient;
pub use session::{Credentials, Session};
pub use transport::{
    ApiBackend, ApiRequest, HttpBackend, ResilientTransport, RetryPolicy, TransportBuildError,
    TransportConfig, TransportError,
};
pub use wikidata::WikidataLabels;
