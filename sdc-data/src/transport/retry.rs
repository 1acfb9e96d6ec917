//! Retry with exponential backoff over an [`ApiBackend`].

use std::time::Duration;

use sdc_core::SyncError;
use serde_json::Value;

use super::{ApiBackend, ApiRequest};

/// Default number of attempts per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// API error codes retried with backoff.
const TRANSIENT_CODES: [&str; 3] = ["maxlag", "ratelimited", "readonly"];

/// API error codes reporting a rejected session or token.
const AUTH_CODES: [&str; 5] = [
    "badtoken",
    "notloggedin",
    "assertuserfailed",
    "assertnameduserfailed",
    "permissiondenied",
];

/// API error codes reporting a missing page or entity.
const NOT_FOUND_CODES: [&str; 2] = ["no-such-entity", "missingtitle"];

/// How many times to try a request and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each later one.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy that retries without sleeping, for tests and dry runs.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Set the attempt count.
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the delay before the first retry.
    #[must_use]
    pub const fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use sdc_data::transport::RetryPolicy;
    ///
    /// let policy = RetryPolicy::default();
    /// assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
    /// assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
    /// assert_eq!(policy.backoff_delay(10), Duration::from_secs(30));
    /// ```
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        2_u32
            .checked_pow(exponent)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    const fn attempts(&self) -> u32 {
        if self.max_attempts == 0 {
            1
        } else {
            self.max_attempts
        }
    }
}

/// Sends API requests, retrying transient failures.
///
/// Every request gains `format=json` and `formatversion=2`; mutating
/// requests also carry `maxlag` so the servers can reject them under
/// replication lag, in which case they are retried like any other transient
/// failure. The transport keeps no state between calls and does not log.
#[derive(Debug)]
pub struct ResilientTransport<B> {
    backend: B,
    policy: RetryPolicy,
    maxlag: u32,
}

impl<B: ApiBackend> ResilientTransport<B> {
    /// Wrap `backend` with the given retry policy and load hint.
    #[must_use]
    pub const fn new(backend: B, policy: RetryPolicy, maxlag: u32) -> Self {
        Self {
            backend,
            policy,
            maxlag,
        }
    }

    /// The wrapped backend.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The retry policy in force.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `request` and return the decoded response body.
    ///
    /// # Errors
    ///
    /// Non-retryable failures are returned from the attempt that raised
    /// them. When every attempt fails with a retryable condition the result
    /// is [`SyncError::RetriesExhausted`] carrying the final failure.
    pub fn send(&self, request: &ApiRequest) -> Result<Value, SyncError> {
        let prepared = request.prepared(self.maxlag);
        let attempts = self.policy.attempts();
        let mut attempt = 1;
        loop {
            let err = match self.attempt(&prepared) {
                Ok(body) => return Ok(body),
                Err(err) => err,
            };
            if !err.is_retryable() {
                return Err(err);
            }
            if attempt >= attempts {
                return Err(SyncError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
            let delay = self.policy.backoff_delay(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            attempt += 1;
        }
    }

    fn attempt(&self, request: &ApiRequest) -> Result<Value, SyncError> {
        let body = self.backend.execute(request)?;
        match api_error(&body, request) {
            Some(err) => Err(err),
            None => Ok(body),
        }
    }
}

/// Classify the `error` object of an API response, if any.
fn api_error(body: &Value, request: &ApiRequest) -> Option<SyncError> {
    let error = body.get("error")?;
    let code = error
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_owned();
    let info = error
        .get("info")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();
    Some(classify_api_error(code, info, request))
}

fn classify_api_error(code: String, info: String, request: &ApiRequest) -> SyncError {
    let code_str = code.as_str();
    if TRANSIENT_CODES.contains(&code_str) || code_str.starts_with("internal_api_error") {
        SyncError::Transient { code, info }
    } else if AUTH_CODES.contains(&code_str) {
        SyncError::AuthFailure { code, info }
    } else if NOT_FOUND_CODES.contains(&code_str) {
        let entity = request
            .get("ids")
            .or_else(|| request.get("titles"))
            .map_or(code, str::to_owned);
        SyncError::NotFound { entity }
    } else {
        SyncError::Remote { code, info }
    }
}
