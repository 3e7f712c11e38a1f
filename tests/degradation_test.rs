//! How the pipeline behaves when a service or a model response fails

use postcraft::pipeline::{GenerationEvent, GenerationRequest, PassName, PipelineOrchestrator};
use postcraft::research::Citation;
use postcraft::session::{InMemorySessionCache, SessionCache, SessionId};
use postcraft::testing::{
    scripted_llm, sustainable_fishing_request, MockLlm, MockResearch, ANGLES_JSON, DRAFT_TOKENS,
    ENHANCE_TOKENS, IDEAS_JSON, OUTLINE_JSON, RESEARCH_SYNTHESIS_JSON,
};
use std::sync::Arc;

fn request(id: &str) -> GenerationRequest {
    GenerationRequest {
        session_id: Some(SessionId::from(id)),
        ..sustainable_fishing_request()
    }
}

fn final_event(events: &[GenerationEvent]) -> Option<&postcraft::pipeline::FinalResult> {
    match events.last() {
        Some(GenerationEvent::Final { result }) => Some(result),
        _ => None,
    }
}

fn error_count(events: &[GenerationEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, GenerationEvent::Error { .. }))
        .count()
}

#[tokio::test]
async fn test_research_feeds_the_idea_prompt() {
    let llm = Arc::new(scripted_llm().build());
    let cache = Arc::new(InMemorySessionCache::default());
    let research = Arc::new(MockResearch::returning(
        "Hand lines catch fewer juveniles than traps.",
        vec![Citation {
            url: "https://example.org/handline".to_string(),
            title: "Hand-line fisheries".to_string(),
        }],
    ));
    let orchestrator = PipelineOrchestrator::builder(llm.clone(), cache.clone())
        .research(research.clone())
        .build()
        .unwrap();

    let events = orchestrator.collect(request("session-research")).await;

    assert!(events.contains(&GenerationEvent::PassComplete {
        pass: PassName::Research
    }));
    assert_eq!(research.queries().len(), 1);

    let session = cache
        .get(&SessionId::from("session-research"))
        .await
        .unwrap()
        .unwrap();
    let record = session.research_pass.unwrap();
    assert_eq!(record.insights, vec!["Hand-line fishing has low bycatch"]);
    assert_eq!(record.sources.len(), 1);

    let idea_prompt = &llm.requests_for(PassName::Idea)[0].prompt;
    assert!(idea_prompt.contains("Hand-line fishing has low bycatch"));
    assert!(final_event(&events).is_some());
}

#[tokio::test]
async fn test_research_outage_degrades_to_empty_record() {
    let llm = Arc::new(scripted_llm().build());
    let cache = Arc::new(InMemorySessionCache::default());
    let orchestrator = PipelineOrchestrator::builder(llm.clone(), cache.clone())
        .research(Arc::new(MockResearch::failing("rate limited")))
        .build()
        .unwrap();

    let events = orchestrator.collect(request("session-outage")).await;

    assert!(events.contains(&GenerationEvent::PassStart {
        pass: PassName::Research
    }));
    assert!(events.contains(&GenerationEvent::PassComplete {
        pass: PassName::Research
    }));
    assert_eq!(error_count(&events), 0);
    assert!(final_event(&events).is_some());

    let session = cache
        .get(&SessionId::from("session-outage"))
        .await
        .unwrap()
        .unwrap();
    let record = session.research_pass.unwrap();
    assert!(record.insights.is_empty());
    assert!(record.risks.is_empty());
    assert!(record.sources.is_empty());
    assert_eq!(llm.call_count(PassName::Research), 0);
}

#[tokio::test]
async fn test_unreadable_score_is_omitted() {
    let llm = Arc::new(
        MockLlm::builder()
            .completion(PassName::Research, RESEARCH_SYNTHESIS_JSON)
            .completion(PassName::Idea, IDEAS_JSON)
            .completion(PassName::Angle, ANGLES_JSON)
            .completion(PassName::Outline, OUTLINE_JSON)
            .stream(PassName::Draft, DRAFT_TOKENS.to_vec())
            .stream(PassName::Enhance, ENHANCE_TOKENS.to_vec())
            .completion(PassName::Scoring, "Looks great, I would give it a solid B.")
            .build(),
    );
    let cache = Arc::new(InMemorySessionCache::default());
    let orchestrator = PipelineOrchestrator::builder(llm.clone(), cache.clone())
        .build()
        .unwrap();

    let events = orchestrator.collect(request("session-noscore")).await;

    assert!(events.contains(&GenerationEvent::PassComplete {
        pass: PassName::Scoring
    }));
    let result = final_event(&events).expect("final event");
    assert_eq!(result.metadata.score, None);
    assert!(!result.metadata.passes_completed.contains(&PassName::Scoring));

    let wire = serde_json::to_value(result).unwrap();
    assert!(wire["metadata"].get("score").is_none());
    assert!(wire["metadata"].get("scoreBreakdown").is_none());
}

#[tokio::test]
async fn test_malformed_ideas_halt_the_run() {
    let llm = Arc::new(
        MockLlm::builder()
            .completion(PassName::Idea, r#"{"ideas": ["only one idea"]}"#)
            .build(),
    );
    let cache = Arc::new(InMemorySessionCache::default());
    let orchestrator = PipelineOrchestrator::builder(llm.clone(), cache.clone())
        .build()
        .unwrap();

    let events = orchestrator.collect(request("session-bad-ideas")).await;

    assert_eq!(error_count(&events), 1);
    assert!(matches!(events.last(), Some(GenerationEvent::Error { .. })));
    assert!(final_event(&events).is_none());
    assert!(!events.contains(&GenerationEvent::PassComplete { pass: PassName::Idea }));
    assert_eq!(llm.call_count(PassName::Angle), 0);

    let session = cache
        .get(&SessionId::from("session-bad-ideas"))
        .await
        .unwrap()
        .unwrap();
    assert!(session.idea_pass.is_none());
}

#[tokio::test]
async fn test_broken_draft_stream_halts_after_partial_tokens() {
    let llm = Arc::new(
        MockLlm::builder()
            .completion(PassName::Idea, IDEAS_JSON)
            .completion(PassName::Angle, ANGLES_JSON)
            .completion(PassName::Outline, OUTLINE_JSON)
            .broken_stream(PassName::Draft, vec!["At dawn "], "connection reset")
            .build(),
    );
    let cache = Arc::new(InMemorySessionCache::default());
    let orchestrator = PipelineOrchestrator::builder(llm.clone(), cache.clone())
        .build()
        .unwrap();

    let events = orchestrator.collect(request("session-broken")).await;

    assert!(events.contains(&GenerationEvent::BodyToken {
        pass: PassName::Draft,
        content: "At dawn ".to_string(),
    }));
    match events.last() {
        Some(GenerationEvent::Error { message }) => assert!(message.contains("connection reset")),
        other => panic!("expected error event, got {other:?}"),
    }

    let session = cache
        .get(&SessionId::from("session-broken"))
        .await
        .unwrap()
        .unwrap();
    assert!(session.outline_pass.is_some());
    assert!(session.draft_pass.is_none());
}

#[tokio::test]
async fn test_rerun_after_failure_resumes_from_saved_passes() {
    let cache = Arc::new(InMemorySessionCache::default());
    let failing = Arc::new(
        MockLlm::builder()
            .completion(PassName::Idea, IDEAS_JSON)
            .completion(PassName::Angle, ANGLES_JSON)
            .completion(PassName::Outline, OUTLINE_JSON)
            .stream_error(PassName::Draft, "upstream 503")
            .build(),
    );
    PipelineOrchestrator::builder(failing, cache.clone())
        .build()
        .unwrap()
        .collect(request("session-resume"))
        .await;

    let healthy = Arc::new(scripted_llm().build());
    let events = PipelineOrchestrator::builder(healthy.clone(), cache.clone())
        .build()
        .unwrap()
        .collect(request("session-resume"))
        .await;

    for pass in [PassName::Idea, PassName::Angle, PassName::Outline] {
        assert!(events.contains(&GenerationEvent::PassSkip { pass }));
        assert_eq!(healthy.call_count(pass), 0);
    }
    assert_eq!(healthy.call_count(PassName::Draft), 1);
    assert!(final_event(&events).is_some());
}

#[tokio::test]
async fn test_failed_rescore_after_change_drops_old_score() {
    let llm = Arc::new(
        scripted_llm()
            .completion(PassName::Scoring, "garbage, not json")
            .build(),
    );
    let cache = Arc::new(InMemorySessionCache::default());
    let orchestrator = PipelineOrchestrator::builder(llm.clone(), cache.clone())
        .build()
        .unwrap();

    let first = orchestrator.collect(request("session-rescore")).await;
    assert_eq!(final_event(&first).unwrap().metadata.score, Some(85));

    let second = orchestrator
        .collect(GenerationRequest {
            has_change: true,
            ..request("session-rescore")
        })
        .await;

    let result = final_event(&second).expect("final event");
    assert_eq!(result.metadata.score, None);
    assert!(result.metadata.suggested_fixes.is_none());
    assert!(!result.metadata.passes_completed.contains(&PassName::Scoring));

    let session = cache
        .get(&SessionId::from("session-rescore"))
        .await
        .unwrap()
        .unwrap();
    assert!(session.scoring_pass.is_none());
}

#[tokio::test]
async fn test_failed_enhance_after_redraft_leaves_no_stale_polish() {
    let llm = Arc::new(
        scripted_llm()
            .stream(PassName::Draft, vec!["Second draft, ", "rewritten."])
            .broken_stream(PassName::Enhance, vec!["Half "], "connection reset")
            .build(),
    );
    let cache = Arc::new(InMemorySessionCache::default());
    let orchestrator = PipelineOrchestrator::builder(llm.clone(), cache.clone())
        .build()
        .unwrap();
    let id = SessionId::from("session-repolish");

    let first = orchestrator.collect(request("session-repolish")).await;
    assert_eq!(final_event(&first).unwrap().body, ENHANCE_TOKENS.concat());

    let changed = orchestrator
        .collect(GenerationRequest {
            has_change: true,
            ..request("session-repolish")
        })
        .await;
    assert!(matches!(changed.last(), Some(GenerationEvent::Error { .. })));

    let session = cache.get(&id).await.unwrap().unwrap();
    assert!(session.enhance_pass.is_none());
    assert!(session.scoring_pass.is_none());
    assert_eq!(session.final_body(), Some("Second draft, rewritten."));

    let resumed = orchestrator.collect(request("session-repolish")).await;
    assert!(resumed.contains(&GenerationEvent::PassSkip {
        pass: PassName::Draft
    }));
    assert!(resumed.contains(&GenerationEvent::PassStart {
        pass: PassName::Enhance
    }));
    assert!(!resumed.iter().any(|e| matches!(
        e,
        GenerationEvent::Final { result } if result.body == ENHANCE_TOKENS.concat()
    )));
}
