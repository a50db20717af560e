//! Shared fixtures for the facet integration tests
#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use scm_facets::backend::SearchBackend;
use scm_facets::config::EngineConfig;
use scm_facets::dsl::{SearchRequest, SearchResponse};
use scm_facets::engine::EngineContext;
use scm_facets::error::BackendError;
use scm_facets::store::{InMemoryStore, RelationalStore};

type Rule = Box<dyn Fn(&SearchRequest) -> Option<Result<Value, BackendError>> + Send + Sync>;

/// Search backend answering from scripted rules, recording every request
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    rules: Arc<Mutex<Vec<Rule>>>,
    requests: Arc<Mutex<Vec<SearchRequest>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request whose primary aggregation is `across`
    pub fn answer(self, across: &str, body: Value) -> Self {
        let across = across.to_string();
        self.when(move |req| (req.across_name() == Some(across.as_str())).then(|| Ok(body.clone())))
    }

    /// Answer `across` requests whose body mentions `needle` as a JSON string
    pub fn answer_for(self, across: &str, needle: &str, body: Value) -> Self {
        let across = across.to_string();
        let needle = format!("\"{}\"", needle);
        self.when(move |req| {
            (req.across_name() == Some(across.as_str()) && req.body().to_string().contains(&needle))
                .then(|| Ok(body.clone()))
        })
    }

    /// First matching rule wins; unmatched requests get an empty body
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

    /// Requests whose primary aggregation is `across`
    pub fn requests_for(&self, across: &str) -> Vec<SearchRequest> {
        self.requests()
            .into_iter()
            .filter(|req| req.across_name() == Some(across))
            .collect()
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

/// `{"aggregations": {name: {"buckets": [...]}}}` with plain `(key, doc_count)` buckets
pub fn terms_response(name: &str, buckets: &[(&str, u64)]) -> Value {
    let buckets: Vec<Value> = buckets
        .iter()
        .map(|(key, count)| json!({ "key": key, "doc_count": count }))
        .collect();
    json!({ "aggregations": { name: { "buckets": buckets } } })
}

/// Context over `backend` with an empty in-memory store
pub fn context(backend: &ScriptedBackend) -> Arc<EngineContext> {
    context_with(backend, Arc::new(InMemoryStore::new()), EngineConfig::default())
}

pub fn context_with(
    backend: &ScriptedBackend,
    store: Arc<dyn RelationalStore>,
    config: EngineConfig,
) -> Arc<EngineContext> {
    Arc::new(EngineContext::new(Arc::new(backend.clone()), store, config))
}
