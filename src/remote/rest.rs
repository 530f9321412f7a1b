//! PostgREST-backed store.
//!
//! # Responsibilities
//! - Translate `RemoteStore` calls into `/rest/v1` and `/functions/v1` requests
//! - Attach `apikey` and bearer token headers
//! - Classify HTTP failures into `StoreError` variants
//! - Delegate subscriptions to the realtime client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Method, RequestBuilder, StatusCode,
};
use serde_json::Value;
use url::Url;

use crate::config::{BackendConfig, RealtimeConfig};
use crate::remote::realtime::RealtimeClient;
use crate::remote::types::{ChangeFeed, Filter, StoreError, StoreResult};
use crate::remote::RemoteStore;
use crate::resilience::retries::{retry_transient, RetryPolicy};

/// Store talking to the hosted backend over HTTP.
#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base: Url,
    realtime: Option<RealtimeClient>,
    read_retry: RetryPolicy,
}

impl RestStore {
    /// Create a store for the backend at `config.url`.
    pub fn new(config: &BackendConfig, realtime: &RealtimeConfig) -> StoreResult<Self> {
        let raw = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Validation("backend url is not configured".to_string()))?;
        let base = normalize_base(raw)?;

        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.anon_key)
            .map_err(|e| StoreError::Validation(format!("invalid api key: {}", e)))?;
        headers.insert("apikey", api_key);
        let token = config.access_token.as_deref().unwrap_or(&config.anon_key);
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| StoreError::Validation(format!("invalid access token: {}", e)))?;
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let realtime = if realtime.enabled {
            Some(RealtimeClient::new(
                &base,
                &config.anon_key,
                config.access_token.clone(),
                realtime.clone(),
            )?)
        } else {
            None
        };

        tracing::info!(base = %base, realtime = realtime.is_some(), "Backend client initialized");
        Ok(Self {
            client,
            base,
            realtime,
            read_retry: RetryPolicy::new(config.read_retries, config.retry_base_ms),
        })
    }

    /// URL for `table` with the filter and conflict target encoded.
    pub fn table_url(&self, table: &str, filter: &Filter, on_conflict: &[&str]) -> StoreResult<Url> {
        let mut url = self
            .base
            .join(&format!("rest/v1/{}", table))
            .map_err(|e| StoreError::Validation(format!("invalid table '{}': {}", table, e)))?;
        {
            let mut query = url.query_pairs_mut();
            for (column, value) in &filter.eq {
                query.append_pair(column, &format!("eq.{}", encode_value(value)));
            }
            if let Some(order) = &filter.order {
                let direction = if order.ascending { "asc" } else { "desc" };
                query.append_pair("order", &format!("{}.{}", order.column, direction));
            }
            if !on_conflict.is_empty() {
                query.append_pair("on_conflict", &on_conflict.join(","));
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    fn function_url(&self, function: &str) -> StoreResult<Url> {
        self.base
            .join(&format!("functions/v1/{}", function))
            .map_err(|e| StoreError::Validation(format!("invalid function '{}': {}", function, e)))
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_status(status, &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn send_rows(&self, request: RequestBuilder) -> StoreResult<Vec<Value>> {
        match self.send(request).await? {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            other => Ok(vec![other]),
        }
    }

    async fn send_one(&self, request: RequestBuilder) -> StoreResult<Value> {
        self.send_rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode("empty representation".to_string()))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("Prefer", "return=representation")
    }
}

fn normalize_base(raw: &str) -> StoreResult<Url> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&with_slash).map_err(|e| StoreError::Validation(format!("invalid backend url: {}", e)))
}

fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Map an HTTP failure onto the store's error taxonomy.
pub fn classify_status(status: StatusCode, body: &str) -> StoreError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    match status.as_u16() {
        401 | 403 => StoreError::Permission(message),
        400 | 409 | 422 => StoreError::Validation(message),
        404 => StoreError::NotFound(message),
        408 | 429 => StoreError::Network(message),
        code if code >= 500 => StoreError::Network(message),
        _ => StoreError::Decode(message),
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn select(&self, table: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        let url = self.table_url(table, filter, &[])?;
        retry_transient(self.read_retry, table, move || {
            self.send_rows(self.client.get(url.clone()))
        })
        .await
    }

    async fn insert(&self, table: &str, row: Value) -> StoreResult<Value> {
        let url = self.table_url(table, &Filter::new(), &[])?;
        self.send_one(self.request(Method::POST, url).json(&row)).await
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &[&str]) -> StoreResult<Value> {
        let url = self.table_url(table, &Filter::new(), on_conflict)?;
        let request = self
            .client
            .post(url)
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&row);
        self.send_one(request).await
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Value) -> StoreResult<Vec<Value>> {
        let url = self.table_url(table, filter, &[])?;
        self.send_rows(self.request(Method::PATCH, url).json(&patch)).await
    }

    async fn delete(&self, table: &str, filter: &Filter) -> StoreResult<usize> {
        if filter.eq.is_empty() {
            return Err(StoreError::Validation(format!(
                "refusing unfiltered delete on {}",
                table
            )));
        }
        let url = self.table_url(table, filter, &[])?;
        Ok(self.send_rows(self.request(Method::DELETE, url)).await?.len())
    }

    async fn invoke(&self, function: &str, body: Value) -> StoreResult<Value> {
        let url = self.function_url(function)?;
        self.send(self.client.post(url).json(&body)).await
    }

    async fn subscribe(&self, table: &str) -> StoreResult<ChangeFeed> {
        match &self.realtime {
            Some(realtime) => Ok(realtime.subscribe(table)),
            None => Err(StoreError::NotFound("realtime is disabled".to_string())),
        }
    }
}
