//! Scripted backend for unit tests

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use super::EngineContext;
use crate::backend::SearchBackend;
use crate::config::EngineConfig;
use crate::dsl::{SearchRequest, SearchResponse};
use crate::error::BackendError;
use crate::store::{InMemoryStore, RelationalStore};

type Rule = Box<dyn Fn(&SearchRequest) -> Option<Result<Value, BackendError>> + Send + Sync>;

/// Answers by request shape and records every request
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    rules: Arc<Mutex<Vec<Rule>>>,
    requests: Arc<Mutex<Vec<SearchRequest>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests whose primary aggregation is `across`
    pub fn answer(self, across: &str, body: Value) -> Self {
        let across = across.to_string();
        self.when(move |req| (req.across_name() == Some(across.as_str())).then(|| Ok(body.clone())))
    }

    /// Custom rule; the first rule returning `Some` wins
    pub fn when<F>(self, rule: F) -> Self
    where
        F: Fn(&SearchRequest) -> Option<Result<Value, BackendError>> + Send + Sync + 'static,
    {
        self.rules.lock().push(Box::new(rule));
        self
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().clone()
    }
}

impl SearchBackend for ScriptedBackend {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        self.requests.lock().push(request.clone());
        let answer = self
            .rules
            .lock()
            .iter()
            .find_map(|rule| rule(request))
            .unwrap_or_else(|| Ok(json!({})))?;
        serde_json::from_value(answer).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

pub fn context(backend: &ScriptedBackend) -> EngineContext {
    context_with_store(backend, Arc::new(InMemoryStore::new()))
}

pub fn context_with_store(backend: &ScriptedBackend, store: Arc<dyn RelationalStore>) -> EngineContext {
    EngineContext::new(Arc::new(backend.clone()), store, EngineConfig::default())
}
