use super::state::AppState;
use crate::error::SessionError;
use crate::session::{SessionHandle, SessionSnapshot};
use crate::wizard::{Consent, StoryMetadata, WizardState, WizardStep};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

#[derive(Debug, Serialize)]
pub struct LeaveGuardResponse {
    pub should_warn: bool,
    pub message: Option<&'static str>,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            fields: Vec::new(),
        }),
    )
        .into_response()
}

fn session_error(e: SessionError) -> Response {
    let status = match &e {
        SessionError::InvalidTransition { .. } | SessionError::NoArtifact => StatusCode::CONFLICT,
        SessionError::Capture(_) => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Submission(_) => StatusCode::BAD_GATEWAY,
        SessionError::Closed => StatusCode::NOT_FOUND,
    };
    error_response(status, e.user_message())
}

fn no_session() -> Response {
    error_response(StatusCode::NOT_FOUND, "No recording session is open")
}

async fn control<F, Fut>(state: &AppState, action: F) -> Response
where
    F: FnOnce(SessionHandle) -> Fut,
    Fut: Future<Output = Result<SessionSnapshot, SessionError>>,
{
    let Some(handle) = state.current_session().await else {
        return no_session();
    };

    match action(handle).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => session_error(e),
    }
}

// ============================================================================
// Wizard
// ============================================================================

/// GET /wizard
pub async fn get_wizard(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.load())
}

/// POST /wizard/consent
/// Consent gate: both confirmations advance to the details step
pub async fn accept_consent(
    State(state): State<AppState>,
    Json(consent): Json<Consent>,
) -> impl IntoResponse {
    let current = state.store.load();
    if current.step != WizardStep::Consent {
        return error_response(StatusCode::CONFLICT, "Consent was already given");
    }

    if !consent.is_granted() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Please confirm you are at least 18 and accept the terms",
        );
    }

    state.store.set_step(WizardStep::Details);

    info!("Consent accepted");
    let next = WizardState {
        step: WizardStep::Details,
        metadata: current.metadata,
    };
    (StatusCode::OK, Json(next)).into_response()
}

/// POST /wizard/details
/// Validates story details and opens the recording step
pub async fn submit_details(
    State(state): State<AppState>,
    Json(metadata): Json<StoryMetadata>,
) -> impl IntoResponse {
    let current = state.store.load();
    if current.step != WizardStep::Details {
        return error_response(
            StatusCode::CONFLICT,
            format!("Story details are not expected at step {}", u8::from(current.step)),
        );
    }

    if let Err(errors) = metadata.validate(Utc::now().date_naive()) {
        warn!("Rejected story details: {} field errors", errors.len());
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: "Please correct the highlighted fields".to_string(),
                fields: errors
                    .iter()
                    .map(|e| FieldError {
                        field: e.field(),
                        message: e.to_string(),
                    })
                    .collect(),
            }),
        )
            .into_response();
    }

    let metadata = metadata.normalized();
    state.store.save(&WizardState {
        step: WizardStep::Recording,
        metadata: Some(metadata.clone()),
    });

    let handle = state.open_session(metadata).await;
    (StatusCode::CREATED, Json(handle.latest())).into_response()
}

// ============================================================================
// Recording
// ============================================================================

/// GET /recording
pub async fn get_recording(State(state): State<AppState>) -> impl IntoResponse {
    control(&state, |handle| async move { handle.snapshot().await }).await
}

/// POST /recording/start
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    control(&state, |handle| async move { handle.start().await }).await
}

/// POST /recording/pause
pub async fn pause_recording(State(state): State<AppState>) -> impl IntoResponse {
    control(&state, |handle| async move { handle.pause().await }).await
}

/// POST /recording/resume
pub async fn resume_recording(State(state): State<AppState>) -> impl IntoResponse {
    control(&state, |handle| async move { handle.resume().await }).await
}

/// POST /recording/stop
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    control(&state, |handle| async move { handle.stop().await }).await
}

/// POST /recording/rerecord
pub async fn rerecord(State(state): State<AppState>) -> impl IntoResponse {
    control(&state, |handle| async move { handle.re_record().await }).await
}

/// POST /recording/submit
/// Responds once the ingestion endpoint answered
pub async fn submit_story(State(state): State<AppState>) -> impl IntoResponse {
    control(&state, |handle| async move { handle.submit().await }).await
}

/// GET /recording/artifact
/// The finalized recording, for review before submitting
pub async fn get_artifact(State(state): State<AppState>) -> impl IntoResponse {
    let Some(handle) = state.current_session().await else {
        return no_session();
    };

    match handle.artifact().await {
        Ok(Some(artifact)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, artifact.content_type)],
            artifact.bytes,
        )
            .into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Nothing has been recorded yet"),
        Err(e) => session_error(e),
    }
}

/// GET /recording/leave-guard
pub async fn leave_guard(State(state): State<AppState>) -> impl IntoResponse {
    let message = match state.current_session().await {
        Some(handle) => handle.latest().leave_warning,
        None => None,
    };

    Json(LeaveGuardResponse {
        should_warn: message.is_some(),
        message,
    })
}

/// DELETE /recording
/// Leave the recording step, releasing the device
pub async fn close_recording(State(state): State<AppState>) -> impl IntoResponse {
    if state.close_session().await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        no_session()
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
