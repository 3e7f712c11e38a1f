//! Sessions persisted to disk survive a new orchestrator and cache

use postcraft::pipeline::{GenerationEvent, GenerationRequest, PassName, PipelineOrchestrator};
use postcraft::session::{FileSessionCache, SessionCache, SessionId};
use postcraft::testing::{scripted_llm, sustainable_fishing_request};
use std::sync::Arc;
use tempfile::TempDir;

fn request() -> GenerationRequest {
    GenerationRequest {
        session_id: Some(SessionId::from("session-on-disk")),
        ..sustainable_fishing_request()
    }
}

#[tokio::test]
async fn test_completed_passes_are_reused_across_processes() {
    let temp_dir = TempDir::new().unwrap();

    let first_llm = Arc::new(scripted_llm().build());
    let first_cache = Arc::new(FileSessionCache::new(temp_dir.path().to_path_buf()));
    let first = PipelineOrchestrator::builder(first_llm.clone(), first_cache)
        .build()
        .unwrap()
        .collect(request())
        .await;
    assert!(first_llm.total_calls() > 0);
    assert!(temp_dir.path().join("session-on-disk.json").exists());

    let second_llm = Arc::new(scripted_llm().build());
    let second_cache = Arc::new(FileSessionCache::new(temp_dir.path().to_path_buf()));
    let second = PipelineOrchestrator::builder(second_llm.clone(), second_cache.clone())
        .build()
        .unwrap()
        .collect(request())
        .await;

    assert_eq!(second_llm.total_calls(), 0);
    for pass in PassName::ALL {
        assert!(second.contains(&GenerationEvent::PassSkip { pass }));
    }
    assert_eq!(first.last(), second.last());

    let stored = second_cache
        .get(&SessionId::from("session-on-disk"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.completed_passes().len(), 6);
}

#[tokio::test]
async fn test_unsafe_session_id_is_reported_as_error_event() {
    let temp_dir = TempDir::new().unwrap();
    let cache = Arc::new(FileSessionCache::new(temp_dir.path().to_path_buf()));
    let events = PipelineOrchestrator::builder(Arc::new(scripted_llm().build()), cache)
        .build()
        .unwrap()
        .collect(GenerationRequest {
            session_id: Some(SessionId::from("../escape")),
            ..sustainable_fishing_request()
        })
        .await;

    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], GenerationEvent::Error { .. }));
}
