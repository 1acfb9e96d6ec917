//! Outbound MediaWiki API requests.

/// Which API a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Wikimedia Commons (`/w/api.php`).
    Commons,
    /// Wikidata (`/w/api.php`).
    Wikidata,
}

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Query string request, used for reads.
    Get,
    /// Form encoded body, used for logins and edits.
    Post,
}

/// A single API call, before protocol parameters are added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// Target API.
    pub endpoint: Endpoint,
    /// HTTP method.
    pub method: Method,
    /// Query or form parameters in insertion order.
    pub params: Vec<(String, String)>,
    /// Whether the call changes remote state.
    pub mutating: bool,
}

impl ApiRequest {
    fn with_action(endpoint: Endpoint, method: Method, action: &str, mutating: bool) -> Self {
        Self {
            endpoint,
            method,
            params: vec![("action".to_owned(), action.to_owned())],
            mutating,
        }
    }

    /// Read request sent with GET.
    #[must_use]
    pub fn read(endpoint: Endpoint, action: &str) -> Self {
        Self::with_action(endpoint, Method::Get, action, false)
    }

    /// Non-mutating POST, such as `action=login`.
    #[must_use]
    pub fn post(endpoint: Endpoint, action: &str) -> Self {
        Self::with_action(endpoint, Method::Post, action, false)
    }

    /// Mutating POST; carries the server load hint once sent.
    #[must_use]
    pub fn edit(endpoint: Endpoint, action: &str) -> Self {
        Self::with_action(endpoint, Method::Post, action, true)
    }

    /// Append a parameter.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_owned(), value.into()));
        self
    }

    /// Value of the first parameter named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// The `action` parameter.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.get("action")
    }

    /// Copy with `format`, `formatversion` and, for edits, `maxlag` added.
    #[must_use]
    pub fn prepared(&self, maxlag: u32) -> Self {
        let mut prepared = self.clone();
        prepared = prepared.param("format", "json").param("formatversion", "2");
        if prepared.mutating {
            prepared = prepared.param("maxlag", maxlag.to_string());
        }
        prepared
    }
}
