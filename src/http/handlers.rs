use super::state::AppState;
use crate::error::ServiceError;
use crate::pipeline::PipelineResult;
use crate::upload::ChunkOutcome;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub pending: bool,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::ProtocolViolation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Storage { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::IncompleteUpload { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::ExtractionFailed(_)
            | ServiceError::TranscriptionFailed(_)
            | ServiceError::TranslationFailed(_) => StatusCode::BAD_GATEWAY,
            ServiceError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        };

        if status.is_server_error() {
            error!("{}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /upload/chunk
/// Accept one chunk of a session's file; the completing chunk triggers
/// reassembly and answers with the session id.
pub async fn upload_chunk(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServiceError> {
    let chunk = parse_chunk_form(multipart).await?;

    let outcome = state
        .tracker
        .submit_chunk(
            &chunk.session_id,
            chunk.chunk_index,
            chunk.total_chunks,
            chunk.declared_size,
            &chunk.blob,
        )
        .await?;

    match outcome {
        ChunkOutcome::Pending => Ok(Json(PendingResponse { pending: true }).into_response()),
        ChunkOutcome::Complete(claim) => {
            let session_id = claim.session_id.clone();
            state.reassembler.reassemble(claim).await?;
            Ok(Json(CompleteResponse { session_id }).into_response())
        }
    }
}

/// POST /process
/// Run the media pipeline on a fully reassembled file.
pub async fn process_video(
    State(state): State<AppState>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<PipelineResult>, ServiceError> {
    info!("processing video for session: {}", req.session_id);

    crate::upload::validate_session_id(&req.session_id)?;

    let video_path = state.store.output_path(&req.session_id);
    if !tokio::fs::try_exists(&video_path).await.unwrap_or(false) {
        return Err(ServiceError::NotFound(format!(
            "no reassembled file for session {}",
            req.session_id
        )));
    }

    let result = state
        .pipeline
        .process(&video_path, state.pipeline_deadline)
        .await?;

    Ok(Json(result))
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// ============================================================================
// Multipart parsing
// ============================================================================

struct ChunkForm {
    session_id: String,
    chunk_index: u32,
    total_chunks: u32,
    declared_size: Option<u64>,
    blob: Vec<u8>,
}

async fn parse_chunk_form(mut multipart: Multipart) -> Result<ChunkForm, ServiceError> {
    let mut session_id = None;
    let mut chunk_index = None;
    let mut total_chunks = None;
    let mut declared_size = None;
    let mut blob = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::ProtocolViolation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "sessionId" => session_id = Some(text_field(field, &name).await?),
            "chunkIndex" => chunk_index = Some(numeric_field::<u32>(field, &name).await?),
            "totalChunks" => total_chunks = Some(numeric_field::<u32>(field, &name).await?),
            "totalFileSize" => declared_size = Some(numeric_field::<u64>(field, &name).await?),
            "file" => {
                blob = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| {
                            ServiceError::ProtocolViolation(format!("unreadable file part: {e}"))
                        })?
                        .to_vec(),
                )
            }
            _ => {}
        }
    }

    Ok(ChunkForm {
        session_id: session_id
            .ok_or_else(|| ServiceError::ProtocolViolation("missing field sessionId".into()))?,
        chunk_index: chunk_index
            .ok_or_else(|| ServiceError::ProtocolViolation("missing field chunkIndex".into()))?,
        total_chunks: total_chunks
            .ok_or_else(|| ServiceError::ProtocolViolation("missing field totalChunks".into()))?,
        declared_size,
        blob: blob.ok_or_else(|| ServiceError::ProtocolViolation("missing file part".into()))?,
    })
}

async fn text_field(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<String, ServiceError> {
    field
        .text()
        .await
        .map_err(|e| ServiceError::ProtocolViolation(format!("unreadable field {name}: {e}")))
}

async fn numeric_field<T: std::str::FromStr>(
    field: axum::extract::multipart::Field<'_>,
    name: &str,
) -> Result<T, ServiceError> {
    let text = text_field(field, name).await?;
    text.trim()
        .parse()
        .map_err(|_| ServiceError::ProtocolViolation(format!("field {name} is not a number: {text:?}")))
}
