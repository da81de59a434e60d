use crate::error::{ServiceError, ServiceResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Blob storage for uploaded chunks and reassembled files.
///
/// Everything lives flat under one working directory with deterministic
/// names (`<session>-<index>` for chunks, `<session>.mp4` for the
/// reassembled file) so that crash recovery or manual inspection needs no
/// separate index.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    work_dir: PathBuf,
}

impl ChunkStore {
    pub fn new(work_dir: impl Into<PathBuf>) -> ServiceResult<Self> {
        let work_dir = work_dir.into();
        fs::create_dir_all(&work_dir)
            .map_err(|e| ServiceError::storage("create working directory", e))?;

        info!("chunk store ready at {}", work_dir.display());

        Ok(Self { work_dir })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn chunk_path(&self, session_id: &str, chunk_index: u32) -> PathBuf {
        self.work_dir.join(format!("{session_id}-{chunk_index}"))
    }

    pub fn output_path(&self, session_id: &str) -> PathBuf {
        self.work_dir.join(format!("{session_id}.mp4"))
    }

    /// Persist one chunk blob. A retransmitted index overwrites the stored
    /// blob rather than duplicating it.
    pub async fn put_chunk(
        &self,
        session_id: &str,
        chunk_index: u32,
        data: &[u8],
    ) -> ServiceResult<()> {
        let path = self.chunk_path(session_id, chunk_index);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| ServiceError::storage(format!("write chunk {}", path.display()), e))
    }

    /// Delete every chunk blob a session may have left behind. Missing
    /// files are fine (already consumed or never received).
    pub async fn remove_chunks(&self, session_id: &str, total_chunks: u32) -> ServiceResult<()> {
        for index in 1..=total_chunks {
            let path = self.chunk_path(session_id, index);
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ServiceError::storage(
                        format!("remove chunk {}", path.display()),
                        e,
                    ))
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn chunk_paths_are_deterministic() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path()).unwrap();

        assert_eq!(
            store.chunk_path("abc", 7),
            dir.path().join("abc-7")
        );
        assert_eq!(store.output_path("abc"), dir.path().join("abc.mp4"));
    }

    #[tokio::test]
    async fn put_chunk_overwrites_previous_blob() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path()).unwrap();

        store.put_chunk("s", 1, b"first").await.unwrap();
        store.put_chunk("s", 1, b"second").await.unwrap();

        let bytes = std::fs::read(store.chunk_path("s", 1)).unwrap();
        assert_eq!(bytes, b"second");
    }

    #[tokio::test]
    async fn remove_chunks_tolerates_missing_files() {
        let dir = TempDir::new().unwrap();
        let store = ChunkStore::new(dir.path()).unwrap();

        store.put_chunk("s", 2, b"data").await.unwrap();
        store.remove_chunks("s", 3).await.unwrap();

        assert!(!store.chunk_path("s", 2).exists());
    }
}
