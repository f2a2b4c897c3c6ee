//! Health check and metrics handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use crate::AppState;
use remedy_common::errors::{AppError, Result};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub knowledge_base: CheckResult,
    pub language_model: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: remedy_common::VERSION.to_string(),
    })
}

/// Readiness probe
///
/// Not ready without diseases to match against. The language model is
/// reported but optional: without it only the enhanced features are off.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let kb_check = if state.kb.is_empty() {
        CheckResult {
            status: "down".to_string(),
            detail: Some("knowledge base is empty or failed to load".to_string()),
        }
    } else {
        CheckResult {
            status: "up".to_string(),
            detail: Some(format!("{} diseases", state.kb.len())),
        }
    };

    let llm_check = match &state.llm {
        Some(model) => CheckResult {
            status: "up".to_string(),
            detail: Some(model.model_name().to_string()),
        },
        None => CheckResult {
            status: "disabled".to_string(),
            detail: None,
        },
    };

    let ready = kb_check.status == "up";
    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(ReadyResponse {
            status: if ready { "ready" } else { "not_ready" }.to_string(),
            checks: HealthChecks {
                knowledge_base: kb_check,
                language_model: llm_check,
            },
        }),
    )
}

/// Prometheus exposition
pub async fn metrics(State(state): State<AppState>) -> Result<String> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or_else(|| AppError::NotFound {
            resource_type: "endpoint".to_string(),
            id: "/metrics".to_string(),
        })
}
