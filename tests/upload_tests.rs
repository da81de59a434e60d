// Integration tests for chunked upload tracking and reassembly.
//
// These cover arrival-order independence, idempotent resubmission,
// exactly-once completion under racing submissions, and cleanup of
// chunk blobs and session state.

use anyhow::Result;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use vidscribe::{
    ChunkOutcome, ChunkStore, CompletedUpload, Reassembler, ServiceError, UploadTracker,
};

fn setup(dir: &TempDir) -> (Arc<ChunkStore>, Arc<UploadTracker>, Reassembler) {
    let store = Arc::new(ChunkStore::new(dir.path()).unwrap());
    let tracker = Arc::new(UploadTracker::new(Arc::clone(&store)));
    let reassembler = Reassembler::new(Arc::clone(&store), Arc::clone(&tracker));
    (store, tracker, reassembler)
}

fn expect_complete(outcome: ChunkOutcome) -> CompletedUpload {
    match outcome {
        ChunkOutcome::Complete(claim) => claim,
        ChunkOutcome::Pending => panic!("expected completion, got pending"),
    }
}

#[tokio::test]
async fn reassembles_in_index_order_for_out_of_order_arrival() -> Result<()> {
    let dir = TempDir::new()?;
    let (store, tracker, reassembler) = setup(&dir);

    // Chunks arrive 3, 1, 2; bytes must still come out as 1, 2, 3.
    let mut claim = None;
    for (index, payload) in [(3u32, b"cc"), (1, b"aa"), (2, b"bb")] {
        match tracker.submit_chunk("vid", index, 3, None, payload).await? {
            ChunkOutcome::Pending => {}
            ChunkOutcome::Complete(c) => claim = Some(c),
        }
    }

    let claim = claim.expect("third chunk should complete the session");
    let output = reassembler.reassemble(claim).await?;

    assert_eq!(fs::read(&output)?, b"aabbcc");

    // Chunk blobs are consumed and the session is gone from the registry.
    for index in 1..=3 {
        assert!(!store.chunk_path("vid", index).exists());
    }
    assert!(!tracker.is_tracked("vid").await);

    Ok(())
}

#[tokio::test]
async fn resubmitted_chunk_overwrites_payload_without_double_count() -> Result<()> {
    let dir = TempDir::new()?;
    let (_store, tracker, reassembler) = setup(&dir);

    let first = tracker.submit_chunk("vid", 1, 2, None, b"xx").await?;
    assert!(matches!(first, ChunkOutcome::Pending));

    // Retransmission of index 1: must not bump the received count.
    let again = tracker.submit_chunk("vid", 1, 2, None, b"yy").await?;
    assert!(matches!(again, ChunkOutcome::Pending));

    let last = tracker.submit_chunk("vid", 2, 2, None, b"zz").await?;
    let output = reassembler.reassemble(expect_complete(last)).await?;

    // The overwriting payload wins.
    assert_eq!(fs::read(&output)?, b"yyzz");

    Ok(())
}

#[tokio::test]
async fn single_chunk_session_completes_on_first_chunk() -> Result<()> {
    let dir = TempDir::new()?;
    let (_store, tracker, reassembler) = setup(&dir);

    let outcome = tracker.submit_chunk("one", 1, 1, None, b"whole file").await?;
    let output = reassembler.reassemble(expect_complete(outcome)).await?;

    assert_eq!(fs::read(&output)?, b"whole file");
    Ok(())
}

#[tokio::test]
async fn total_chunks_mismatch_is_rejected_and_state_preserved() -> Result<()> {
    let dir = TempDir::new()?;
    let (store, tracker, reassembler) = setup(&dir);

    tracker.submit_chunk("vid", 1, 3, None, b"aa").await?;

    let err = tracker
        .submit_chunk("vid", 2, 4, None, b"bb")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ProtocolViolation(_)));

    // Prior state is untouched: chunk 1 still there, chunk 2 never stored,
    // and the session still completes with the recorded total.
    assert_eq!(fs::read(store.chunk_path("vid", 1))?, b"aa");
    assert!(!store.chunk_path("vid", 2).exists());

    tracker.submit_chunk("vid", 2, 3, None, b"bb").await?;
    let last = tracker.submit_chunk("vid", 3, 3, None, b"cc").await?;
    let output = reassembler.reassemble(expect_complete(last)).await?;

    assert_eq!(fs::read(&output)?, b"aabbcc");
    Ok(())
}

#[tokio::test]
async fn completion_signaled_exactly_once_when_last_two_chunks_race() -> Result<()> {
    let dir = TempDir::new()?;
    let (_store, tracker, _reassembler) = setup(&dir);

    tracker.submit_chunk("race", 1, 3, None, b"aa").await?;

    let t2 = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move { tracker.submit_chunk("race", 2, 3, None, b"bb").await })
    };
    let t3 = {
        let tracker = Arc::clone(&tracker);
        tokio::spawn(async move { tracker.submit_chunk("race", 3, 3, None, b"cc").await })
    };

    let (r2, r3) = (t2.await??, t3.await??);

    let completions = [&r2, &r3]
        .iter()
        .filter(|o| matches!(o, ChunkOutcome::Complete(_)))
        .count();
    assert_eq!(completions, 1, "exactly one submission must claim completion");

    Ok(())
}

#[tokio::test]
async fn declared_size_is_validated_after_reassembly() -> Result<()> {
    let dir = TempDir::new()?;
    let (store, tracker, reassembler) = setup(&dir);

    tracker.submit_chunk("vid", 1, 2, Some(999), b"aa").await?;
    let last = tracker.submit_chunk("vid", 2, 2, Some(999), b"bb").await?;
    let claim = expect_complete(last);
    let output_path = claim.output_path.clone();

    let err = reassembler.reassemble(claim).await.unwrap_err();
    assert!(matches!(err, ServiceError::ProtocolViolation(_)));

    // No partial artifact survives an integrity failure.
    assert!(!output_path.exists());
    assert!(!store.chunk_path("vid", 1).exists());
    assert!(!store.chunk_path("vid", 2).exists());
    assert!(!tracker.is_tracked("vid").await);

    Ok(())
}

#[tokio::test]
async fn matching_declared_size_passes() -> Result<()> {
    let dir = TempDir::new()?;
    let (_store, tracker, reassembler) = setup(&dir);

    tracker.submit_chunk("vid", 1, 2, Some(4), b"ab").await?;
    let last = tracker.submit_chunk("vid", 2, 2, Some(4), b"cd").await?;
    let output = reassembler.reassemble(expect_complete(last)).await?;

    assert_eq!(fs::read(&output)?, b"abcd");
    Ok(())
}

#[tokio::test]
async fn missing_chunk_blob_is_an_incomplete_upload() -> Result<()> {
    let dir = TempDir::new()?;
    let (store, tracker, _) = setup(&dir);
    let reassembler = Reassembler::new(Arc::clone(&store), Arc::clone(&tracker));

    // Simulate a tracker/store inconsistency: a claim for 2 chunks while
    // only chunk 1 exists on disk.
    store.put_chunk("broken", 1, b"aa").await?;
    let claim = CompletedUpload {
        session_id: "broken".to_string(),
        total_chunks: 2,
        output_path: store.output_path("broken"),
        declared_size: None,
    };
    let output_path = claim.output_path.clone();

    let err = reassembler.reassemble(claim).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::IncompleteUpload {
            missing_index: 2,
            ..
        }
    ));
    assert!(!output_path.exists(), "partial output must be deleted");

    Ok(())
}

#[tokio::test]
async fn stale_sessions_can_be_listed_and_evicted() -> Result<()> {
    let dir = TempDir::new()?;
    let (store, tracker, _reassembler) = setup(&dir);

    tracker.submit_chunk("aband", 1, 3, None, b"aa").await?;

    // Zero age bound: every incomplete session is stale.
    let stale = tracker.stale_sessions(chrono::Duration::zero()).await;
    assert_eq!(stale, vec!["aband".to_string()]);

    // A generous age bound lists nothing.
    let stale = tracker.stale_sessions(chrono::Duration::hours(1)).await;
    assert!(stale.is_empty());

    tracker.evict("aband").await?;
    assert!(!tracker.is_tracked("aband").await);
    assert!(!store.chunk_path("aband", 1).exists());

    Ok(())
}
