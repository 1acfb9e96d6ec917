//! Login and edit-token handling.
//!
//! A failed login never stops a run: it is logged as a warning and the
//! session carries on anonymously. A missing edit token only matters once a
//! write is attempted, where it surfaces as
//! [`SyncError::MissingEditToken`].

use log::{info, warn};
use sdc_core::SyncError;
use serde_json::Value;

use crate::transport::{ApiBackend, ApiRequest, Endpoint, ResilientTransport};

/// Bot-password credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account name, usually `User@BotName`.
    pub username: String,
    /// Bot password.
    pub password: String,
}

impl Credentials {
    /// Credentials for `username`.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authentication state shared by every write in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<String>,
    csrf_token: Option<String>,
}

impl Session {
    /// Session with no login and no edit token.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            user: None,
            csrf_token: None,
        }
    }

    /// Session holding an edit token, for tests and pre-authenticated use.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            user: None,
            csrf_token: Some(token.into()),
        }
    }

    /// Log in when `credentials` are given, then fetch an edit token if
    /// `want_edit_token` is set.
    ///
    /// Login and token failures are logged and leave the corresponding part
    /// of the session empty.
    #[must_use]
    pub fn establish<B: ApiBackend>(
        transport: &ResilientTransport<B>,
        credentials: Option<&Credentials>,
        want_edit_token: bool,
    ) -> Self {
        let user = match credentials {
            Some(creds) => match login(transport, creds) {
                Ok(name) => {
                    info!("Logged in to Commons as {name}");
                    Some(name)
                }
                Err(err) => {
                    warn!("Login as {} failed, continuing anonymously: {err}", creds.username);
                    None
                }
            },
            None => {
                info!("No credentials configured; using an anonymous session");
                None
            }
        };
        let csrf_token = if want_edit_token {
            match fetch_token(transport, "csrf") {
                Ok(token) => Some(token),
                Err(err) => {
                    warn!("Could not obtain an edit token; writes will fail: {err}");
                    None
                }
            }
        } else {
            None
        };
        Self { user, csrf_token }
    }

    /// Logged-in account name, if login succeeded.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Edit token for mutating calls.
    #[must_use]
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }
}

fn fetch_token<B: ApiBackend>(
    transport: &ResilientTransport<B>,
    kind: &str,
) -> Result<String, SyncError> {
    let body = transport.send(
        &ApiRequest::read(Endpoint::Commons, "query")
            .param("meta", "tokens")
            .param("type", kind),
    )?;
    let key = format!("{kind}token");
    body.pointer("/query/tokens")
        .and_then(|tokens| tokens.get(&key))
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| SyncError::decode(format!("fetching a {kind} token"), "token missing"))
}

fn login<B: ApiBackend>(
    transport: &ResilientTransport<B>,
    credentials: &Credentials,
) -> Result<String, SyncError> {
    let token = fetch_token(transport, "login")?;
    let body = transport.send(
        &ApiRequest::post(Endpoint::Commons, "login")
            .param("lgname", credentials.username.clone())
            .param("lgpassword", credentials.password.clone())
            .param("lgtoken", token),
    )?;
    let result = body.pointer("/login/result").and_then(Value::as_str);
    if result == Some("Success") {
        let name = body
            .pointer("/login/lgusername")
            .and_then(Value::as_str)
            .unwrap_or(&credentials.username);
        return Ok(name.to_owned());
    }
    let reason = body
        .pointer("/login/reason")
        .and_then(Value::as_str)
        .unwrap_or("no reason given");
    Err(SyncError::AuthFailure {
        code: result.unwrap_or("unknown").to_owned(),
        info: reason.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RetryPolicy;
    use crate::transport::test_support::ScriptedBackend;
    use rstest::rstest;
    use serde_json::json;

    fn transport(backend: ScriptedBackend) -> ResilientTransport<ScriptedBackend> {
        ResilientTransport::new(backend, RetryPolicy::immediate(2), 5)
    }

    fn tokens() -> ScriptedBackend {
        ScriptedBackend::new()
            .respond(
                "tokens:login",
                Ok(json!({ "query": { "tokens": { "logintoken": "L+\\" } } })),
            )
            .respond(
                "tokens:csrf",
                Ok(json!({ "query": { "tokens": { "csrftoken": "C+\\" } } })),
            )
    }

    #[rstest]
    fn successful_login_fetches_an_edit_token() {
        let backend = tokens().respond(
            "login",
            Ok(json!({ "login": { "result": "Success", "lgusername": "Example@sync" } })),
        );
        let transport = transport(backend);
        let creds = Credentials::new("Example@sync", "secret");

        let session = Session::establish(&transport, Some(&creds), true);

        assert_eq!(session.user(), Some("Example@sync"));
        assert_eq!(session.csrf_token(), Some("C+\\"));
        let login = transport
            .backend()
            .requests()
            .into_iter()
            .find(|r| r.action() == Some("login"))
            .expect("login request sent");
        assert_eq!(login.get("lgtoken"), Some("L+\\"));
    }

    #[rstest]
    fn failed_login_degrades_to_anonymous() {
        let backend = tokens().respond(
            "login",
            Ok(json!({ "login": { "result": "Failed", "reason": "Incorrect password" } })),
        );
        let transport = transport(backend);
        let creds = Credentials::new("Example@sync", "wrong");

        let session = Session::establish(&transport, Some(&creds), true);

        assert_eq!(session.user(), None);
        assert_eq!(session.csrf_token(), Some("C+\\"));
    }

    #[rstest]
    fn simulate_runs_skip_the_edit_token() {
        let transport = transport(tokens());

        let session = Session::establish(&transport, None, false);

        assert_eq!(session, Session::anonymous());
        assert!(transport.backend().requests().is_empty());
    }

    #[rstest]
    fn password_is_not_printed() {
        let creds = Credentials::new("Example@sync", "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
