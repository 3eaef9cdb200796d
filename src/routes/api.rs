use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::GenerateError;
use crate::render::render;
use crate::state::AppState;
use crate::template::{normalize, resolve_template, ParticipantBinding, PartialTemplate};

pub async fn index() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "sertifikat",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn get_template(State(state): State<AppState>) -> impl IntoResponse {
    match state.templates.get_template().await {
        Ok(template) => Json(template).into_response(),
        Err(e) => store_error(&e.to_string()),
    }
}

pub async fn put_template(
    State(state): State<AppState>,
    Json(template): Json<PartialTemplate>,
) -> impl IntoResponse {
    match state.templates.put_template(&template).await {
        Ok(()) => Json(serde_json::json!({ "success": true })).into_response(),
        Err(e) => store_error(&e.to_string()),
    }
}

pub async fn normalize_template(Json(template): Json<PartialTemplate>) -> impl IntoResponse {
    Json(normalize(template))
}

#[derive(Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub template: PartialTemplate,
    pub binding: Option<ParticipantBinding>,
}

/// Live preview: same normalize/resolve/render pipeline as generation, no
/// persisted state touched.
pub async fn preview_template(Json(request): Json<PreviewRequest>) -> impl IntoResponse {
    let template = normalize(request.template);
    let binding = request.binding.unwrap_or_else(ParticipantBinding::sample);
    let resolved = resolve_template(&template, &binding);
    Json(render(&template, &resolved))
}

pub async fn generate_one(
    State(state): State<AppState>,
    Path((event_id, participant_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.coordinator.generate_one(&event_id, &participant_id).await {
        Ok(record) => Json(serde_json::json!({
            "success": true,
            "certificate": record
        }))
        .into_response(),
        Err(e) => generate_error(e),
    }
}

pub async fn generate_bulk(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> impl IntoResponse {
    // A bulk run over a large roster must not hold the request forever: the
    // token cancels dispatch after the configured window, in-flight items
    // still finish and get counted.
    let cancel = CancellationToken::new();
    let deadline = cancel.clone();
    let timeout = Duration::from_secs(state.config.bulk_timeout_secs);
    let timer = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        deadline.cancel();
    });

    let outcome = state.coordinator.generate_bulk(&event_id, cancel).await;
    timer.abort();

    match outcome {
        Ok(result) => Json(serde_json::json!({
            "success": true,
            "generated": result.generated,
            "failed": result.failed
        }))
        .into_response(),
        Err(e) => generate_error(e),
    }
}

pub async fn list_certificates(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> impl IntoResponse {
    match state.certificates.list_by_event(&event_id).await {
        Ok(records) => Json(records).into_response(),
        Err(e) => store_error(&e.to_string()),
    }
}

/// Delivery step's transition `generated -> issued`.
pub async fn mark_issued(
    State(state): State<AppState>,
    Path((event_id, participant_id)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.certificates.mark_issued(&event_id, &participant_id).await {
        Ok(true) => Json(serde_json::json!({ "success": true })).into_response(),
        Ok(false) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "success": false,
                "error": "no certificate in state 'generated' for this participant"
            })),
        )
            .into_response(),
        Err(e) => store_error(&e.to_string()),
    }
}

fn generate_error(e: GenerateError) -> axum::response::Response {
    let status = match &e {
        GenerateError::NotEligible { .. } => StatusCode::NOT_FOUND,
        GenerateError::MissingBinding { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        GenerateError::Export(_) => StatusCode::BAD_GATEWAY,
        GenerateError::TemplateStore(_)
        | GenerateError::Records(_)
        | GenerateError::Registrations(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    )
        .into_response()
}

fn store_error(message: &str) -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "success": false, "error": message })),
    )
        .into_response()
}
