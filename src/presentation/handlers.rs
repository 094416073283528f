// HTTP request handlers
use crate::application::chat_session::{SessionView, SubmitOutcome};
use crate::domain::enhancement::{EnhancementError, EnhancementKind};
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub text: String,
}

#[derive(Deserialize)]
pub struct SelectRequest {
    pub value: String,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
    pub session: SessionView,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementEntry {
    pub kind: EnhancementKind,
    pub label: &'static str,
    pub options: &'static [&'static str],
    pub pro: bool,
    pub selected: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

impl IntoResponse for EnhancementError {
    fn into_response(self) -> Response {
        let status = match self {
            EnhancementError::UnknownKind(_) => StatusCode::NOT_FOUND,
            EnhancementError::UnknownOption { .. } => StatusCode::BAD_REQUEST,
        };
        error_response(status, self)
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current dashboard snapshot
pub async fn get_dashboard(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.dashboard_service.snapshot();
    match json_response(StatusCode::OK, &snapshot, accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Stream a snapshot after every simulator tick
pub async fn stream_dashboard(headers: HeaderMap, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rx = state.streaming_service.stream_dashboard();
    stream_from_receiver(rx, accepts_brotli(&headers)).await
}

/// Transcript, in-flight flag and active enhancements
pub async fn get_chat(State(state): State<Arc<AppState>>) -> Json<SessionView> {
    Json(state.chat_session.view())
}

/// Submit one user message and wait for the reply
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitRequest>,
) -> Response {
    let outcome = state.chat_session.submit(&request.text).await;
    let status = match outcome {
        SubmitOutcome::Busy => StatusCode::CONFLICT,
        _ => StatusCode::OK,
    };

    let body = SubmitResponse {
        outcome,
        session: state.chat_session.view(),
    };
    (status, Json(body)).into_response()
}

/// Start a new chat
pub async fn reset_chat(State(state): State<Arc<AppState>>) -> Response {
    match state.chat_session.reset() {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(busy) => error_response(StatusCode::CONFLICT, busy),
    }
}

/// Enhancement catalog with the current selection per kind
pub async fn list_enhancements(State(state): State<Arc<AppState>>) -> Json<Vec<EnhancementEntry>> {
    let selections = state.chat_session.selections();
    let entries = EnhancementKind::ALL
        .into_iter()
        .map(|kind| EnhancementEntry {
            kind,
            label: kind.label(),
            options: kind.options(),
            pro: kind.is_pro(),
            selected: selections
                .iter()
                .find(|s| s.kind == kind)
                .map(|s| s.value.clone()),
        })
        .collect();
    Json(entries)
}

pub async fn select_enhancement(
    Path(kind): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<SessionView>, EnhancementError> {
    let kind: EnhancementKind = kind.parse()?;
    state.chat_session.select_enhancement(kind, &request.value)?;
    Ok(Json(state.chat_session.view()))
}

pub async fn clear_enhancement(
    Path(kind): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, EnhancementError> {
    let kind: EnhancementKind = kind.parse()?;
    state.chat_session.clear_enhancement(kind);
    Ok(StatusCode::NO_CONTENT)
}
