//! API Handlers
//!
//! HTTP request handlers for each cache endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use tracing::debug;

use crate::cache::CacheManager;
use crate::error::{CacheError, Result};
use crate::models::{
    ClearRequest, ClearResponse, DeleteResponse, GetResponse, HealthResponse, SetRequest,
    SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheManager>,
}

impl AppState {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Self { cache }
    }
}

/// Handler for PUT /set
///
/// Stores a value; responds 503 when the remote tier rejects the write.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let namespace = req.namespace().to_string();
    let (key, value, options) = req.into_parts();

    if !state.cache.set(&key, value, options).await {
        return Err(CacheError::Remote(format!(
            "write of '{}' was not accepted",
            key
        )));
    }

    Ok(Json(SetResponse::new(namespace, key)))
}

/// Handler for GET /get/:namespace/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key, &namespace).await {
        Some(value) => Ok(Json(GetResponse::new(namespace, key, value))),
        None => Err(CacheError::NotFound(format!("{}:{}", namespace, key))),
    }
}

/// Handler for DELETE /del/:namespace/:key
///
/// Local copies are always dropped; 404 means the remote tier held nothing.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    if state.cache.delete(&key, &namespace).await {
        Ok(Json(DeleteResponse::new(namespace, key)))
    } else {
        Err(CacheError::NotFound(format!("{}:{}", namespace, key)))
    }
}

/// Handler for POST /clear
///
/// A missing or empty body clears every tier.
pub async fn clear_handler(
    State(state): State<AppState>,
    body: Option<Json<ClearRequest>>,
) -> Json<ClearResponse> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    debug!(namespace = ?req.namespace, pattern = ?req.pattern, "clear requested");

    let removed = state
        .cache
        .clear(req.namespace.as_deref(), req.pattern.as_deref())
        .await;

    Json(ClearResponse { removed })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.get_stats().await;
    let (hot_entries, warm_entries) = state.cache.local_sizes().await;

    Json(StatsResponse::new(&stats, hot_entries, warm_entries))
}

/// Handler for GET /health
///
/// 200 when healthy, 503 otherwise; the body is the same shape either way.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let healthy = state.cache.health_check().await;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(HealthResponse::new(healthy, state.cache.remote().name())))
}

/// Handler for GET /metrics
///
/// Prometheus text exposition of the manager's registry.
pub async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let body = state.cache.metrics().encode()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheValue, MemoryRemote};
    use crate::config::Config;

    fn state_with_remote() -> (AppState, Arc<MemoryRemote>) {
        let remote = Arc::new(MemoryRemote::new());
        let manager = CacheManager::new(Config::default(), remote.clone()).unwrap();
        (AppState::new(Arc::new(manager)), remote)
    }

    fn set_request(key: &str, value: &str) -> SetRequest {
        serde_json::from_value(serde_json::json!({"key": key, "value": value})).unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let (state, _) = state_with_remote();

        let result = set_handler(State(state.clone()), Json(set_request("test_key", "test_value"))).await;
        assert!(result.is_ok());

        let response = get_handler(
            State(state),
            Path(("default".to_string(), "test_key".to_string())),
        )
        .await
        .unwrap();
        assert_eq!(response.value, CacheValue::from("test_value"));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let (state, _) = state_with_remote();
        let result = get_handler(
            State(state),
            Path(("default".to_string(), "nonexistent".to_string())),
        )
        .await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_with_remote_down_is_remote_error() {
        let (state, remote) = state_with_remote();
        remote.set_available(false);

        let result = set_handler(State(state), Json(set_request("k", "v"))).await;
        assert!(matches!(result, Err(CacheError::Remote(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let (state, _) = state_with_remote();
        set_handler(State(state.clone()), Json(set_request("to_delete", "value")))
            .await
            .unwrap();

        let path = || Path(("default".to_string(), "to_delete".to_string()));
        assert!(delete_handler(State(state.clone()), path()).await.is_ok());
        assert!(delete_handler(State(state.clone()), path()).await.is_err());
        assert!(get_handler(State(state), path()).await.is_err());
    }

    #[tokio::test]
    async fn test_clear_handler_without_body() {
        let (state, _) = state_with_remote();
        set_handler(State(state.clone()), Json(set_request("a", "1")))
            .await
            .unwrap();

        let response = clear_handler(State(state), None).await;
        assert_eq!(response.removed, 1);
    }

    #[tokio::test]
    async fn test_health_handler_reports_outage() {
        let (state, remote) = state_with_remote();
        let (status, body) = health_handler(State(state.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_healthy());

        remote.set_available(false);
        let (status, _) = health_handler(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let (state, _) = state_with_remote();
        let result = set_handler(State(state), Json(set_request("", "value"))).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }
}
