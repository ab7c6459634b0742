//! Integration tests for the conversation session
//!
//! Drives full turns against scripted generation and speech doubles and
//! checks the message log, preference persistence and failure recovery.

use std::sync::Arc;
use std::time::Duration;

use stack_advisor::config::SessionConfig;
use stack_advisor::generation::GenerationError;
use stack_advisor::preferences::{
    FileKvStore, KeyValueStore, MemoryKvStore, PreferenceRecord, PreferenceStore,
};
use stack_advisor::session::{ConversationSession, Sender, SessionError, TurnOutcome, TurnState};
use stack_advisor::speech::CaptureError;
use stack_advisor::testing::{
    FailingKvStore, MockGenerator, RecordingSpeech, ScriptedSpeechInput,
};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Test Fixtures and Helpers
// =============================================================================

const KEY: &str = "techStackPreferences";

fn apology() -> String {
    SessionConfig::default().apology_message
}

/// Session over an in-memory store shared with the caller
fn create_session(
    generator: Arc<MockGenerator>,
) -> (ConversationSession, Arc<MemoryKvStore>, RecordingSpeech) {
    let backend = Arc::new(MemoryKvStore::new());
    let speech = RecordingSpeech::new();
    let session = ConversationSession::new(
        PreferenceStore::new(Box::new(backend.clone()), KEY),
        generator,
        Box::new(speech.clone()),
        SessionConfig::default(),
    );
    (session, backend, speech)
}

fn stored_record(backend: &MemoryKvStore) -> Option<PreferenceRecord> {
    backend
        .get(KEY)
        .unwrap()
        .map(|raw| serde_json::from_str(&raw).unwrap())
}

// =============================================================================
// Submission Tests
// =============================================================================

#[tokio::test]
async fn test_blank_submissions_are_noops() {
    let generator = Arc::new(MockGenerator::new());
    let (mut session, backend, _) = create_session(generator.clone());

    assert_eq!(session.submit("").await.unwrap(), TurnOutcome::Ignored);
    assert_eq!(session.submit("   ").await.unwrap(), TurnOutcome::Ignored);
    assert_eq!(session.submit("\n\t").await.unwrap(), TurnOutcome::Ignored);

    assert!(session.messages().is_empty());
    assert_eq!(generator.call_count(), 0);
    assert_eq!(backend.get(KEY).unwrap(), None);
    assert_eq!(session.state(), TurnState::Idle);
}

#[tokio::test]
async fn test_successful_turn_appends_reply_and_speaks() {
    let generator = Arc::new(MockGenerator::replying("Try FastAPI."));
    let (mut session, _, speech) = create_session(generator.clone());

    let outcome = session.submit("I use Python with Django").await.unwrap();

    assert_eq!(outcome, TurnOutcome::Replied("Try FastAPI.".to_string()));
    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(messages[0].text, "I use Python with Django");
    assert_eq!(messages[1].sender, Sender::Assistant);
    assert_eq!(messages[1].text, "Try FastAPI.");
    assert!(messages[0].timestamp <= messages[1].timestamp);

    assert_eq!(
        speech.spoken(),
        vec![("Try FastAPI.".to_string(), "en-US".to_string())]
    );
    assert_eq!(session.state(), TurnState::Idle);
}

#[tokio::test]
async fn test_prompt_uses_preferences_from_same_turn() {
    let generator = Arc::new(MockGenerator::new());
    let (mut session, _, _) = create_session(generator.clone());

    session.submit("Is Laravel fine for a blog?").await.unwrap();

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("The user is asking: \"Is Laravel fine for a blog?\""));
    assert!(prompts[0].contains("tools/frameworks: Laravel. "));
    assert!(prompts[0].contains("Their last project was a blog application. "));
}

#[tokio::test]
async fn test_preferences_accumulate_across_turns() {
    let generator = Arc::new(MockGenerator::new());
    let (mut session, backend, _) = create_session(generator);

    session.submit("I know Python").await.unwrap();
    session.submit("Can I build an e-commerce app with Go?").await.unwrap();

    let languages: Vec<&str> = session.preferences().preferred_languages.iter().collect();
    assert_eq!(languages, vec!["Python", "Go"]);
    assert_eq!(
        session.preferences().last_project_type.as_deref(),
        Some("e-commerce")
    );
    assert_eq!(stored_record(&backend).as_ref(), Some(session.preferences()));
}

// =============================================================================
// Failure Recovery Tests
// =============================================================================

#[tokio::test]
async fn test_generation_failure_appends_single_apology() {
    let generator = Arc::new(MockGenerator::failing(GenerationError::Status {
        status: 500,
        body: "boom".to_string(),
    }));
    let (mut session, backend, speech) = create_session(generator);

    let outcome = session.submit("React or Vue?").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Failed);

    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].sender, Sender::Assistant);
    assert_eq!(messages[1].text, apology());

    // Extraction ran before the call and is kept
    let tools: Vec<&str> = session.preferences().previous_tools.iter().collect();
    assert_eq!(tools, vec!["React", "Vue"]);
    assert_eq!(stored_record(&backend).as_ref(), Some(session.preferences()));

    assert!(speech.spoken().is_empty());
    assert_eq!(session.state(), TurnState::Idle);
}

#[tokio::test]
async fn test_session_usable_after_failure() {
    let generator = Arc::new(MockGenerator::with_responses(vec![
        Err(GenerationError::Transport("connection reset".to_string())),
        Ok("Second time lucky.".to_string()),
    ]));
    let (mut session, _, _) = create_session(generator.clone());

    assert_eq!(session.submit("first").await.unwrap(), TurnOutcome::Failed);
    assert_eq!(
        session.submit("second").await.unwrap(),
        TurnOutcome::Replied("Second time lucky.".to_string())
    );
    assert_eq!(session.messages().len(), 4);
    assert_eq!(generator.call_count(), 2);
}

#[tokio::test]
async fn test_cancelled_submit_appends_apology() {
    let generator = Arc::new(MockGenerator::new().with_delay(Duration::from_secs(60)));
    let (mut session, _, _) = create_session(generator);

    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = session
        .submit_with_cancel("Angular?", cancel)
        .await
        .unwrap();

    assert_eq!(outcome, TurnOutcome::Failed);
    assert_eq!(session.messages().len(), 2);
    assert_eq!(session.messages()[1].text, apology());
}

#[tokio::test(start_paused = true)]
async fn test_reply_timeout_appends_apology() {
    let generator = Arc::new(MockGenerator::new().with_delay(Duration::from_secs(600)));
    let backend = Arc::new(MemoryKvStore::new());
    let mut session = ConversationSession::new(
        PreferenceStore::new(Box::new(backend), KEY),
        generator,
        Box::new(RecordingSpeech::new()),
        SessionConfig {
            reply_timeout_secs: 1,
            ..Default::default()
        },
    );

    let outcome = session.submit("Spring or Express?").await.unwrap();

    assert_eq!(outcome, TurnOutcome::Failed);
    assert_eq!(session.messages()[1].text, apology());
    assert_eq!(session.state(), TurnState::Idle);
}

// =============================================================================
// Submission Policy Tests
// =============================================================================

#[tokio::test]
async fn test_second_submission_while_awaiting_is_rejected() {
    let generator = Arc::new(MockGenerator::new());
    let (mut session, _, _) = create_session(generator.clone());

    let turn = session.begin_turn("first question").unwrap().unwrap();
    assert!(turn.prompt().contains("first question"));
    assert_eq!(session.state(), TurnState::AwaitingReply);

    assert_eq!(session.submit("second").await, Err(SessionError::Busy));
    assert_eq!(session.messages().len(), 1);
    assert_eq!(generator.call_count(), 0);

    session
        .on_generation_success("answer".to_string())
        .unwrap();
    assert_eq!(session.messages().len(), 2);
    assert_eq!(
        session.on_generation_success("duplicate".to_string()),
        Err(SessionError::NotAwaitingReply)
    );
    assert_eq!(session.messages().len(), 2);
}

// =============================================================================
// Clear Tests
// =============================================================================

#[tokio::test]
async fn test_clear_conversation_keeps_preferences() {
    let generator = Arc::new(MockGenerator::new());
    let (mut session, backend, _) = create_session(generator);

    session.submit("TypeScript dashboard with Angular").await.unwrap();
    let before = serde_json::to_string(session.preferences()).unwrap();
    let stored_before = backend.get(KEY).unwrap();

    session.clear_conversation();

    assert!(session.messages().is_empty());
    assert_eq!(serde_json::to_string(session.preferences()).unwrap(), before);
    assert_eq!(backend.get(KEY).unwrap(), stored_before);
}

#[tokio::test]
async fn test_clear_preferences_persists_empty_record() {
    let generator = Arc::new(MockGenerator::new());
    let (mut session, backend, _) = create_session(generator);

    session.submit("Ruby on a mobile app").await.unwrap();
    assert!(!session.preferences().is_empty());

    session.clear_preferences();

    assert!(session.preferences().is_empty());
    assert_eq!(session.messages().len(), 2);
    assert_eq!(stored_record(&backend), Some(PreferenceRecord::default()));
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[tokio::test]
async fn test_preferences_survive_new_session() {
    let dir = tempdir().unwrap();

    {
        let mut session = ConversationSession::new(
            PreferenceStore::new(Box::new(FileKvStore::new(dir.path())), KEY),
            Arc::new(MockGenerator::new()),
            Box::new(RecordingSpeech::new()),
            SessionConfig::default(),
        );
        session.submit("I write PHP for every API").await.unwrap();
    }

    let session = ConversationSession::new(
        PreferenceStore::new(Box::new(FileKvStore::new(dir.path())), KEY),
        Arc::new(MockGenerator::new()),
        Box::new(RecordingSpeech::new()),
        SessionConfig::default(),
    );

    assert!(session.messages().is_empty());
    let languages: Vec<&str> = session.preferences().preferred_languages.iter().collect();
    assert_eq!(languages, vec!["PHP"]);
    assert_eq!(session.preferences().last_project_type.as_deref(), Some("API"));
}

#[tokio::test]
async fn test_stored_record_uses_camel_case_keys() {
    let generator = Arc::new(MockGenerator::new());
    let (mut session, backend, _) = create_session(generator);

    session.submit("Flask").await.unwrap();

    let raw = backend.get(KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["preferredLanguages"], serde_json::json!([]));
    assert_eq!(value["previousTools"], serde_json::json!(["Flask"]));
    assert_eq!(value["projectRequirements"], serde_json::json!({}));
    assert_eq!(value["lastProjectType"], serde_json::json!(""));
}

#[tokio::test]
async fn test_malformed_stored_record_starts_empty() {
    let backend = Arc::new(MemoryKvStore::new());
    backend.set(KEY, "{\"preferredLanguages\": 42").unwrap();

    let mut session = ConversationSession::new(
        PreferenceStore::new(Box::new(backend.clone()), KEY),
        Arc::new(MockGenerator::new()),
        Box::new(RecordingSpeech::new()),
        SessionConfig::default(),
    );

    assert!(session.preferences().is_empty());
    assert!(session.is_persisting());

    session.submit("Java").await.unwrap();
    assert_eq!(stored_record(&backend).as_ref(), Some(session.preferences()));
}

#[tokio::test]
async fn test_unreadable_store_runs_memory_only() {
    let backend = Arc::new(FailingKvStore::new());
    let mut session = ConversationSession::new(
        PreferenceStore::new(Box::new(backend.clone()), KEY),
        Arc::new(MockGenerator::replying("ok")),
        Box::new(RecordingSpeech::new()),
        SessionConfig::default(),
    );

    assert!(!session.is_persisting());
    let outcome = session.submit("Ruby and Vue").await.unwrap();

    assert_eq!(outcome, TurnOutcome::Replied("ok".to_string()));
    assert_eq!(session.preferences().previous_tools.len(), 1);
    assert_eq!(backend.write_attempts(), 0);
}

#[tokio::test]
async fn test_write_failure_switches_to_memory_only() {
    let backend = Arc::new(FailingKvStore::writes_only());
    let mut session = ConversationSession::new(
        PreferenceStore::new(Box::new(backend.clone()), KEY),
        Arc::new(MockGenerator::new()),
        Box::new(RecordingSpeech::new()),
        SessionConfig::default(),
    );

    assert!(session.is_persisting());
    session.submit("Python").await.unwrap();
    assert!(!session.is_persisting());
    session.submit("Django").await.unwrap();

    assert_eq!(backend.write_attempts(), 1);
    assert_eq!(session.messages().len(), 4);
    let tools: Vec<&str> = session.preferences().previous_tools.iter().collect();
    assert_eq!(tools, vec!["Django"]);
}

// =============================================================================
// Voice Capture Tests
// =============================================================================

#[tokio::test]
async fn test_listen_submits_transcript() {
    let generator = Arc::new(MockGenerator::replying("Use Vue 3."));
    let (mut session, _, _) = create_session(generator.clone());
    let input = ScriptedSpeechInput::new(vec![Ok("Is Vue good for a dashboard?".to_string())]);

    let outcome = session.listen(&input).await.unwrap();

    assert_eq!(outcome, TurnOutcome::Replied("Use Vue 3.".to_string()));
    assert_eq!(session.messages()[0].text, "Is Vue good for a dashboard?");
    assert_eq!(input.locales(), vec!["en-US"]);
    assert!(!session.is_listening());
}

#[tokio::test]
async fn test_capture_failures_reset_listening() {
    let generator = Arc::new(MockGenerator::new());
    let (mut session, _, _) = create_session(generator.clone());
    let input = ScriptedSpeechInput::new(vec![
        Err(CaptureError::PermissionDenied),
        Err(CaptureError::NoSpeech),
        Ok("   ".to_string()),
    ]);

    for _ in 0..3 {
        assert_eq!(session.listen(&input).await.unwrap(), TurnOutcome::Ignored);
        assert!(!session.is_listening());
    }

    assert!(session.messages().is_empty());
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_listen_while_listening_is_noop() {
    let generator = Arc::new(MockGenerator::new());
    let (mut session, _, _) = create_session(generator);
    let input = ScriptedSpeechInput::new(vec![Ok("Go".to_string())]);

    assert!(session.begin_capture());
    assert_eq!(session.listen(&input).await.unwrap(), TurnOutcome::Ignored);
    assert!(input.locales().is_empty());
    assert!(session.is_listening());
}
