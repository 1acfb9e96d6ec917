//! Scripted backend for exercising the transport and adapters offline.
//!
//! [`ScriptedBackend`] answers each request from a queue of canned results
//! keyed by route (see [`route_of`]). Queued results are consumed in order
//! and the final one is replayed for any further calls, so a single
//! scripted failure keeps failing while `fail, fail, succeed` plays out
//! exactly once.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use serde_json::Value;

use super::{ApiBackend, ApiRequest, Endpoint, TransportError};

/// Route key for a request.
///
/// Most requests are keyed by their `action`. Queries are split further:
/// `tokens:login` and `tokens:csrf` for token fetches, `categorymembers`
/// for category pages, `pageids` for page existence checks and `titles` for
/// title lookups. Wikidata routes carry a `wikidata:` prefix.
#[must_use]
pub fn route_of(request: &ApiRequest) -> String {
    match request.endpoint {
        Endpoint::Commons => action_route(request),
        Endpoint::Wikidata => format!("wikidata:{}", action_route(request)),
    }
}

fn action_route(request: &ApiRequest) -> String {
    let action = request.action().unwrap_or_default();
    if action != "query" {
        return action.to_owned();
    }
    if request.get("meta") == Some("tokens") {
        return format!("tokens:{}", request.get("type").unwrap_or("csrf"));
    }
    if let Some(generator) = request.get("generator") {
        return generator.to_owned();
    }
    if request.get("pageids").is_some() {
        return "pageids".to_owned();
    }
    "titles".to_owned()
}

/// Backend replaying canned results and recording every request.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: RefCell<HashMap<String, VecDeque<Result<Value, TransportError>>>>,
    requests: RefCell<Vec<ApiRequest>>,
}

impl ScriptedBackend {
    /// Backend with no scripted routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `result` for `route`.
    #[must_use]
    pub fn respond(self, route: &str, result: Result<Value, TransportError>) -> Self {
        self.script
            .borrow_mut()
            .entry(route.to_owned())
            .or_default()
            .push_back(result);
        self
    }

    /// Every request received, in order, with protocol parameters applied.
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.borrow().clone()
    }

    /// Number of requests received for `route`.
    #[must_use]
    pub fn calls(&self, route: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|request| route_of(request) == route)
            .count()
    }

    /// Number of mutating requests received.
    #[must_use]
    pub fn mutating_calls(&self) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|request| request.mutating)
            .count()
    }
}

impl ApiBackend for ScriptedBackend {
    fn execute(&self, request: &ApiRequest) -> Result<Value, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        let route = route_of(request);
        let mut script = self.script.borrow_mut();
        let queue = script
            .get_mut(&route)
            .ok_or_else(|| TransportError::Decode {
                url: format!("scripted://{route}"),
                message: "no scripted response".to_owned(),
            })?;
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        next.unwrap_or_else(|| {
            Err(TransportError::Decode {
                url: format!("scripted://{route}"),
                message: "script exhausted".to_owned(),
            })
        })
    }
}
