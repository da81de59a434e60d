use thiserror::Error;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level error taxonomy.
///
/// Upload errors are recovered at the session boundary and surfaced to the
/// uploading client; pipeline stage errors carry the failing stage name and
/// are surfaced only after artifact cleanup has run.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or inconsistent chunk metadata. Not retryable.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Read/write failure on a chunk blob or the reassembled file.
    /// Transient; the client may retry the affected chunk.
    #[error("storage failure ({context}): {source}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Reassembly found a missing chunk despite the tracker reporting
    /// completion. Indicates a tracker/store inconsistency.
    #[error("incomplete upload {session_id}: chunk {missing_index} missing")]
    IncompleteUpload {
        session_id: String,
        missing_index: u32,
    },

    #[error("audio extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("translation failed: {0}")]
    TranslationFailed(String),

    /// Caller-supplied deadline on the whole pipeline expired. Takes the
    /// same cleanup path as a stage failure.
    #[error("pipeline deadline of {0:?} exceeded")]
    DeadlineExceeded(std::time::Duration),

    #[error("not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    pub fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    /// Name of the pipeline stage this error belongs to, if any.
    pub const fn stage(&self) -> Option<&'static str> {
        match self {
            Self::ExtractionFailed(_) => Some("extract"),
            Self::TranscriptionFailed(_) => Some("transcribe"),
            Self::TranslationFailed(_) => Some("translate"),
            _ => None,
        }
    }
}
