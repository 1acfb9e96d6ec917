//! `reqwest`-backed [`ApiBackend`].
//!
//! The adapters in this crate are synchronous so the driver can stay a plain
//! loop. [`HttpBackend`] bridges to async `reqwest` by blocking on a Tokio
//! runtime it owns, or on the caller's multi-threaded runtime when there is
//! one.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};

use super::{
    ApiBackend, ApiRequest, Endpoint, Method, ResilientTransport, RetryPolicy, TransportError,
};

/// Production Commons API.
pub const DEFAULT_COMMONS_API: &str = "https://commons.wikimedia.org/w/api.php";

/// Production Wikidata API.
pub const DEFAULT_WIKIDATA_API: &str = "https://www.wikidata.org/w/api.php";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default replication lag, in seconds, tolerated by edits.
pub const DEFAULT_MAXLAG: u32 = 5;

/// Failure to construct an [`HttpBackend`].
#[derive(Debug, Error)]
pub enum TransportBuildError {
    /// No client identification string was configured.
    #[error("a user agent is required; set one identifying the operator")]
    MissingUserAgent,
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

/// Settings for talking to the Commons and Wikidata APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Commons API URL.
    pub commons_api: String,
    /// Wikidata API URL.
    pub wikidata_api: String,
    /// Client identification sent with every request.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// `maxlag` sent with mutating requests.
    pub maxlag: u32,
    /// Retry behaviour for transient failures.
    pub retry: RetryPolicy,
}

impl TransportConfig {
    /// Configuration for the production APIs with the given user agent.
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            commons_api: DEFAULT_COMMONS_API.to_owned(),
            wikidata_api: DEFAULT_WIKIDATA_API.to_owned(),
            user_agent: user_agent.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            maxlag: DEFAULT_MAXLAG,
            retry: RetryPolicy::default(),
        }
    }

    /// Point at a different Commons API.
    #[must_use]
    pub fn with_commons_api(mut self, url: impl Into<String>) -> Self {
        self.commons_api = url.into();
        self
    }

    /// Point at a different Wikidata API.
    #[must_use]
    pub fn with_wikidata_api(mut self, url: impl Into<String>) -> Self {
        self.wikidata_api = url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the `maxlag` value.
    #[must_use]
    pub const fn with_maxlag(mut self, maxlag: u32) -> Self {
        self.maxlag = maxlag;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url_for(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Commons => &self.commons_api,
            Endpoint::Wikidata => &self.wikidata_api,
        }
    }
}

/// Blocking HTTP backend with a cookie-backed session.
///
/// # Runtime behaviour
///
/// Outside any Tokio runtime, or inside a `current_thread` one, requests run
/// on the backend's own runtime. Inside a multi-threaded runtime they run on
/// the caller's runtime via [`tokio::task::block_in_place`].
pub struct HttpBackend {
    client: Client,
    config: TransportConfig,
    runtime: Runtime,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl HttpBackend {
    /// Build a backend from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportBuildError::MissingUserAgent`] when the user agent
    /// is blank, before anything touches the network, or a build error from
    /// the HTTP client or runtime.
    pub fn new(config: TransportConfig) -> Result<Self, TransportBuildError> {
        if config.user_agent.trim().is_empty() {
            return Err(TransportBuildError::MissingUserAgent);
        }
        let client = Client::builder()
            .user_agent(config.user_agent.trim())
            .cookie_store(true)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(TransportBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            runtime,
        })
    }

    /// The configuration the backend was built with.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn execute_async(&self, request: &ApiRequest) -> Result<Value, TransportError> {
        let url = self.config.url_for(request.endpoint);
        let builder = match request.method {
            Method::Get => self.client.get(url).query(&request.params),
            Method::Post => self.client.post(url).form(&request.params),
        };
        let body = builder
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        serde_json::from_str(&body).map_err(|err| TransportError::Decode {
            url: url.to_owned(),
            message: err.to_string(),
        })
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &str) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout {
                url: url.to_owned(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return TransportError::Http {
                url: url.to_owned(),
                status: status.as_u16(),
            };
        }
        TransportError::Network {
            url: url.to_owned(),
            message: error.to_string(),
        }
    }
}

impl ApiBackend for HttpBackend {
    fn execute(&self, request: &ApiRequest) -> Result<Value, TransportError> {
        let future = self.execute_async(request);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}

impl ResilientTransport<HttpBackend> {
    /// Build an HTTP transport from `config`.
    ///
    /// # Errors
    ///
    /// See [`HttpBackend::new`].
    pub fn connect(config: &TransportConfig) -> Result<Self, TransportBuildError> {
        let backend = HttpBackend::new(config.clone())?;
        Ok(Self::new(backend, config.retry, config.maxlag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_user_agents_are_rejected(#[case] agent: &str) {
        let err = HttpBackend::new(TransportConfig::new(agent)).expect_err("no agent");
        assert!(matches!(err, TransportBuildError::MissingUserAgent));
    }

    #[rstest]
    fn config_routes_endpoints_to_their_apis() {
        let config = TransportConfig::new("sdc-sync/0.1 (ops@example.org)")
            .with_commons_api("http://commons.test/w/api.php");
        assert_eq!(
            config.url_for(Endpoint::Commons),
            "http://commons.test/w/api.php"
        );
        assert_eq!(config.url_for(Endpoint::Wikidata), DEFAULT_WIKIDATA_API);
    }

    #[rstest]
    fn connect_carries_the_configured_policy() {
        let config = TransportConfig::new("sdc-sync/0.1 (ops@example.org)")
            .with_retry(RetryPolicy::immediate(2))
            .with_maxlag(3);
        let transport = ResilientTransport::connect(&config).expect("transport builds");
        assert_eq!(transport.policy(), &RetryPolicy::immediate(2));
        assert_eq!(transport.backend().config().maxlag, 3);
    }
}
