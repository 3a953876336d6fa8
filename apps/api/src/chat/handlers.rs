use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::controller::UploadOutcome;
use crate::chat::session::{ConversationTurn, SessionState};
use crate::chat::store::SessionHandle;
use crate::errors::AppError;
use crate::state::AppState;

/// Multipart field carrying the resume file.
const RESUME_FIELD: &str = "resume";

#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub history: Vec<ConversationTurn>,
    pub resume_uploaded: bool,
    pub started_at: DateTime<Utc>,
}

impl SessionSnapshot {
    fn new(session_id: Uuid, state: &SessionState) -> Self {
        Self {
            session_id,
            history: state.history().to_vec(),
            resume_uploaded: state.resume_available(),
            started_at: state.started_at(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Processed,
    AlreadyProcessed,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub reply: ConversationTurn,
    pub history: Vec<ConversationTurn>,
}

async fn session_handle(state: &AppState, id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionSnapshot>) {
    let (id, handle) = state.sessions.create().await;
    let session = handle.lock().await;
    (StatusCode::CREATED, Json(SessionSnapshot::new(id, &session)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = session_handle(&state, id).await?;
    let session = handle.lock().await;
    Ok(Json(SessionSnapshot::new(id, &session)))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.end(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// POST /api/v1/sessions/:id/resume (multipart, field `resume`)
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let handle = session_handle(&state, id).await?;
    let file = read_resume_field(multipart).await?;

    let mut session = handle.lock().await;
    let outcome = state.controller.handle_upload(&mut session, &file).await?;

    Ok(Json(match outcome {
        UploadOutcome::Processed(text) => UploadResponse {
            status: UploadStatus::Processed,
            resume_text: Some(text),
        },
        UploadOutcome::AlreadyProcessed => UploadResponse {
            status: UploadStatus::AlreadyProcessed,
            resume_text: None,
        },
    }))
}

/// POST /api/v1/sessions/:id/messages
pub async fn handle_send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let handle = session_handle(&state, id).await?;
    let mut session = handle.lock().await;
    let reply = state
        .controller
        .handle_user_message(&mut session, &req.message)
        .await?;
    Ok(Json(MessageResponse {
        reply,
        history: session.history().to_vec(),
    }))
}

/// POST /api/v1/sessions/:id/retry
pub async fn handle_retry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    let handle = session_handle(&state, id).await?;
    let mut session = handle.lock().await;
    let reply = state.controller.retry_last_turn(&mut session).await?;
    Ok(Json(MessageResponse {
        reply,
        history: session.history().to_vec(),
    }))
}

async fn read_resume_field(mut multipart: Multipart) -> Result<Bytes, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some(RESUME_FIELD) {
            return field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read resume upload: {e}")));
        }
    }
    Err(AppError::Validation(format!(
        "Missing '{RESUME_FIELD}' file field"
    )))
}
