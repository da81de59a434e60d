use super::store::ChunkStore;
use super::tracker::{CompletedUpload, UploadTracker};
use crate::error::{ServiceError, ServiceResult};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Concatenates a completed session's chunks into one output file.
///
/// Invoked at most once per session, guaranteed by the tracker handing out
/// a single [`CompletedUpload`] claim. The bulk byte copy runs on the
/// blocking pool so the triggering request does not starve the runtime.
pub struct Reassembler {
    store: Arc<ChunkStore>,
    tracker: Arc<UploadTracker>,
}

impl Reassembler {
    pub fn new(store: Arc<ChunkStore>, tracker: Arc<UploadTracker>) -> Self {
        Self { store, tracker }
    }

    /// Append chunks 1..=total in index order to the output path, deleting
    /// each blob after its append. On any failure the partial output is
    /// removed so no artifact is left behind; the session entry is dropped
    /// either way.
    pub async fn reassemble(&self, claim: CompletedUpload) -> ServiceResult<PathBuf> {
        let store = Arc::clone(&self.store);
        let session_id = claim.session_id.clone();

        let result = tokio::task::spawn_blocking(move || concatenate(&store, &claim))
            .await
            .map_err(|e| {
                ServiceError::storage(
                    "reassembly task",
                    io::Error::new(io::ErrorKind::Other, e.to_string()),
                )
            })
            .and_then(|inner| inner);

        // The session leaves the registry whether or not the concatenation
        // succeeded; its chunks are consumed or swept already.
        self.tracker.remove(&session_id).await;

        match &result {
            Ok(path) => info!("session {} reassembled to {}", session_id, path.display()),
            Err(e) => error!("reassembly of session {} failed: {}", session_id, e),
        }

        result
    }
}

fn concatenate(store: &ChunkStore, claim: &CompletedUpload) -> ServiceResult<PathBuf> {
    let output_path = claim.output_path.clone();

    if let Err(e) = append_chunks(store, claim, &output_path) {
        // No partial artifact: drop the half-written output and whatever
        // chunk blobs were not consumed yet.
        remove_quietly(&output_path);
        for index in 1..=claim.total_chunks {
            remove_quietly(&store.chunk_path(&claim.session_id, index));
        }
        return Err(e);
    }

    Ok(output_path)
}

fn append_chunks(
    store: &ChunkStore,
    claim: &CompletedUpload,
    output_path: &Path,
) -> ServiceResult<()> {
    let out = File::create(output_path)
        .map_err(|e| ServiceError::storage(format!("create {}", output_path.display()), e))?;
    let mut writer = BufWriter::new(out);
    let mut total_bytes: u64 = 0;

    for index in 1..=claim.total_chunks {
        let chunk_path = store.chunk_path(&claim.session_id, index);

        let mut chunk = match File::open(&chunk_path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Unreachable when the tracker's invariant holds; checked
                // anyway so a store inconsistency cannot produce a file
                // with silent gaps.
                return Err(ServiceError::IncompleteUpload {
                    session_id: claim.session_id.clone(),
                    missing_index: index,
                });
            }
            Err(e) => {
                return Err(ServiceError::storage(
                    format!("open chunk {}", chunk_path.display()),
                    e,
                ))
            }
        };

        total_bytes += io::copy(&mut chunk, &mut writer)
            .map_err(|e| ServiceError::storage(format!("append chunk {index}"), e))?;
        drop(chunk);

        std::fs::remove_file(&chunk_path)
            .map_err(|e| ServiceError::storage(format!("remove chunk {index}"), e))?;
    }

    writer
        .flush()
        .map_err(|e| ServiceError::storage("flush reassembled file", e))?;

    // Integrity check against the client-declared size, when supplied.
    if let Some(declared) = claim.declared_size {
        if declared != total_bytes {
            return Err(ServiceError::ProtocolViolation(format!(
                "reassembled size {total_bytes} does not match declared {declared}"
            )));
        }
    }

    Ok(())
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            error!("failed to remove {}: {}", path.display(), e);
        }
    }
}
