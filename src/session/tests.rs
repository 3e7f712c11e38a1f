//! Tests for session state and the in-memory cache

use super::*;
use crate::pipeline::PassName;
use std::sync::Arc;

fn idea_record() -> IdeaRecord {
    IdeaRecord {
        ideas: vec![
            "Day on a Cô Tô lobster boat".to_string(),
            "Why size limits protect next season".to_string(),
            "Tasting the difference of line-caught".to_string(),
        ],
        selected_idea: "Day on a Cô Tô lobster boat".to_string(),
    }
}

fn outline_record() -> OutlineRecord {
    OutlineRecord {
        title: "Fishing for tomorrow".to_string(),
        outline: "Hook: a dawn scene\nMain points: limits, seasons\nCTA: ask readers".to_string(),
        hashtags: "#seafood #sustainable #coto".to_string(),
    }
}

#[test]
fn test_new_session_has_no_records() {
    let session = GenerationSession::new();
    assert!(session.completed_passes().is_empty());
    assert!(session.final_body().is_none());
}

#[test]
fn test_apply_only_touches_patched_keys() {
    let mut session = GenerationSession::new();
    session.apply(idea_record().into());
    session.apply(outline_record().into());

    assert_eq!(
        session.completed_passes(),
        vec![PassName::Idea, PassName::Outline]
    );

    // Replacing the outline leaves the idea record alone
    let mut replacement = outline_record();
    replacement.title = "A new title".to_string();
    session.apply(replacement.into());

    assert_eq!(session.idea_pass, Some(idea_record()));
    assert_eq!(session.outline_pass.unwrap().title, "A new title");
}

#[test]
fn test_final_body_prefers_enhanced() {
    let mut session = GenerationSession::new();
    session.apply(
        DraftRecord {
            draft: "raw draft".to_string(),
        }
        .into(),
    );
    assert_eq!(session.final_body(), Some("raw draft"));

    session.apply(
        EnhanceRecord {
            enhanced: "polished draft".to_string(),
        }
        .into(),
    );
    assert_eq!(session.final_body(), Some("polished draft"));
}

#[test]
fn test_clear_patch_drops_only_named_records() {
    let mut session = GenerationSession::new();
    session.apply(idea_record().into());
    session.apply(outline_record().into());

    session.apply(SessionPatch::clear([PassName::Outline, PassName::Scoring]));

    assert_eq!(session.completed_passes(), vec![PassName::Idea]);
    assert!(session.outline_pass.is_none());
}

#[test]
fn test_patch_can_replace_and_clear_together() {
    let mut session = GenerationSession::new();
    session.apply(
        EnhanceRecord {
            enhanced: "old polish".to_string(),
        }
        .into(),
    );

    session.apply(SessionPatch {
        draft_pass: Some(DraftRecord {
            draft: "new draft".to_string(),
        }),
        cleared: vec![PassName::Enhance],
        ..SessionPatch::default()
    });

    assert_eq!(session.final_body(), Some("new draft"));
}

#[test]
fn test_patch_touched_reports_single_key() {
    let patch: SessionPatch = ResearchRecord::empty().into();
    assert_eq!(patch.touched(), vec![PassName::Research]);
}

#[test]
fn test_session_wire_format_omits_absent_passes() {
    let mut session = GenerationSession::new();
    session.apply(idea_record().into());

    let json = serde_json::to_value(&session).unwrap();
    assert!(json.get("ideaPass").is_some());
    assert!(json.get("anglePass").is_none());
    assert_eq!(json["ideaPass"]["selectedIdea"], "Day on a Cô Tô lobster boat");

    let back: GenerationSession = serde_json::from_value(json).unwrap();
    assert_eq!(back, session);
}

#[test]
fn test_session_id_path_safety() {
    assert!(SessionId::new().is_path_safe());
    assert!(SessionId::from("abc_DEF-123").is_path_safe());
    assert!(!SessionId::from("a/b").is_path_safe());
    assert!(!SessionId::from("").is_path_safe());
}

#[tokio::test]
async fn test_get_or_create_is_lazy_and_stable() {
    let cache = InMemorySessionCache::new(8);
    let id = SessionId::from("lazy");

    assert!(cache.get(&id).await.unwrap().is_none());
    let created = cache
        .get_or_create(&id, GenerationSession::new())
        .await
        .unwrap();
    let again = cache
        .get_or_create(&id, GenerationSession::new())
        .await
        .unwrap();

    assert_eq!(created.created_at, again.created_at);
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_update_creates_missing_session() {
    let cache = InMemorySessionCache::default();
    let id = SessionId::from("implicit");

    cache.update_session(&id, idea_record().into()).await.unwrap();

    let session = cache.get(&id).await.unwrap().unwrap();
    assert_eq!(session.completed_passes(), vec![PassName::Idea]);
}

#[tokio::test]
async fn test_concurrent_updates_to_distinct_keys_all_land() {
    let cache = Arc::new(InMemorySessionCache::new(4));
    let id = SessionId::from("concurrent");

    let mut handles = Vec::new();
    for i in 0..16 {
        let cache = cache.clone();
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            let patch: SessionPatch = if i % 2 == 0 {
                idea_record().into()
            } else {
                outline_record().into()
            };
            cache.update_session(&id, patch).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let session = cache.get(&id).await.unwrap().unwrap();
    assert_eq!(session.idea_pass, Some(idea_record()));
    assert_eq!(session.outline_pass, Some(outline_record()));
}

#[tokio::test]
async fn test_lru_evicts_oldest_session() {
    let cache = InMemorySessionCache::new(2);
    for name in ["one", "two", "three"] {
        cache
            .get_or_create(&SessionId::from(name), GenerationSession::new())
            .await
            .unwrap();
    }

    assert!(cache.get(&SessionId::from("one")).await.unwrap().is_none());
    assert!(cache.get(&SessionId::from("three")).await.unwrap().is_some());
}

#[tokio::test]
async fn test_zero_capacity_still_holds_one_session() {
    let cache = InMemorySessionCache::new(0);
    let id = SessionId::from("tiny");
    cache.update_session(&id, idea_record().into()).await.unwrap();
    assert!(cache.get(&id).await.unwrap().is_some());
}
