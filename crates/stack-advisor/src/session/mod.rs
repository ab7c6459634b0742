//! Conversation session
//!
//! Owns the message log and the preference record and drives each turn:
//! extraction, persistence, prompt composition, the generation call and
//! appending the reply. A turn moves `Idle -> Composing -> AwaitingReply
//! -> Idle`; a submission arriving while a reply is pending is rejected
//! with `SessionError::Busy` and leaves the log untouched.

pub mod message;

pub use message::{Message, Sender};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::generation::{GenerationError, GenerationProvider};
use crate::preferences::{PreferenceExtractor, PreferenceRecord, PreferenceStore};
use crate::prompt::PromptComposer;
use crate::speech::{CaptureError, SpeechInput, SpeechOutput};

/// Errors returned by session commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A generation call for an earlier message has not resolved yet
    #[error("A reply is still pending for the previous message")]
    Busy,

    /// A generation result arrived with no turn waiting for it
    #[error("No reply is pending")]
    NotAwaitingReply,
}

/// Per-turn state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Composing,
    AwaitingReply,
}

/// A started turn waiting for its generation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    prompt: String,
}

impl PendingTurn {
    /// The composed prompt to send to the generation service
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// How a submission ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input or an empty capture; nothing was appended
    Ignored,
    /// The reply was appended to the log
    Replied(String),
    /// Generation failed and the apology was appended instead
    Failed,
}

/// Live conversation state for one user
pub struct ConversationSession {
    id: Uuid,
    messages: Vec<Message>,
    preferences: PreferenceRecord,
    state: TurnState,
    listening: bool,
    store: PreferenceStore,
    extractor: PreferenceExtractor,
    composer: PromptComposer,
    generator: Arc<dyn GenerationProvider>,
    speech: Box<dyn SpeechOutput>,
    config: SessionConfig,
}

impl ConversationSession {
    /// Start a session, loading the persisted preferences from `store`
    pub fn new(
        mut store: PreferenceStore,
        generator: Arc<dyn GenerationProvider>,
        speech: Box<dyn SpeechOutput>,
        config: SessionConfig,
    ) -> Self {
        let preferences = store.load();
        let id = Uuid::new_v4();

        info!(
            session_id = %id,
            generator = generator.name(),
            languages = preferences.preferred_languages.len(),
            tools = preferences.previous_tools.len(),
            "Session started"
        );

        Self {
            id,
            messages: Vec::new(),
            preferences,
            state: TurnState::Idle,
            listening: false,
            store,
            extractor: PreferenceExtractor::default(),
            composer: PromptComposer::new(),
            generator,
            speech,
            config,
        }
    }

    /// Replace the built-in extractor
    pub fn with_extractor(mut self, extractor: PreferenceExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The message log, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn preferences(&self) -> &PreferenceRecord {
        &self.preferences
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// False once a storage failure left the session memory-only
    pub fn is_persisting(&self) -> bool {
        !self.store.is_degraded()
    }

    /// Submit a message and wait for the reply
    pub async fn submit(&mut self, raw_text: &str) -> Result<TurnOutcome, SessionError> {
        self.submit_with_cancel(raw_text, CancellationToken::new())
            .await
    }

    /// Submit a message, abandoning the generation call if `cancel` fires
    ///
    /// Cancellation, the reply timeout and dropping the returned future all
    /// settle the turn through the failure path.
    pub async fn submit_with_cancel(
        &mut self,
        raw_text: &str,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, SessionError> {
        let Some(turn) = self.begin_turn(raw_text)? else {
            return Ok(TurnOutcome::Ignored);
        };

        let generator = Arc::clone(&self.generator);
        let timeout_secs = self.config.reply_timeout_secs;
        let mut guard = PendingReplyGuard {
            session: self,
            settled: false,
        };

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
            reply = tokio::time::timeout(
                Duration::from_secs(timeout_secs),
                generator.generate(turn.prompt()),
            ) => reply.unwrap_or(Err(GenerationError::Timeout(timeout_secs))),
        };

        guard.settled = true;
        Ok(guard.session.complete_turn(result))
    }

    /// Start a turn without calling the generator
    ///
    /// Appends the user message, folds it into the preferences, persists
    /// them and composes the prompt. Blank input returns `Ok(None)` and
    /// changes nothing. The caller must settle the turn with
    /// [`on_generation_success`](Self::on_generation_success) or
    /// [`on_generation_failure`](Self::on_generation_failure).
    pub fn begin_turn(&mut self, raw_text: &str) -> Result<Option<PendingTurn>, SessionError> {
        if raw_text.trim().is_empty() {
            debug!(session_id = %self.id, "Ignoring blank input");
            return Ok(None);
        }

        if self.state == TurnState::AwaitingReply {
            warn!(session_id = %self.id, "Rejecting submission while a reply is pending");
            return Err(SessionError::Busy);
        }

        self.state = TurnState::Composing;
        self.messages.push(Message::user(raw_text));

        self.preferences = self.extractor.extract(raw_text, &self.preferences);
        self.store.save(&self.preferences);

        let prompt = self.composer.compose(raw_text, &self.preferences);
        debug!(
            session_id = %self.id,
            prompt_len = prompt.len(),
            "Composed prompt"
        );

        self.state = TurnState::AwaitingReply;
        Ok(Some(PendingTurn { prompt }))
    }

    /// Append the reply, return to idle and hand the reply to speech output
    pub fn on_generation_success(&mut self, reply: String) -> Result<(), SessionError> {
        if self.state != TurnState::AwaitingReply {
            return Err(SessionError::NotAwaitingReply);
        }

        self.speech.speak(&reply, &self.config.locale);
        self.messages.push(Message::assistant(reply));
        self.state = TurnState::Idle;
        Ok(())
    }

    /// Append the fixed apology and return to idle
    ///
    /// The error itself is only logged.
    pub fn on_generation_failure(&mut self, error: &GenerationError) -> Result<(), SessionError> {
        if self.state != TurnState::AwaitingReply {
            return Err(SessionError::NotAwaitingReply);
        }

        warn!(
            session_id = %self.id,
            generator = self.generator.name(),
            "Generation failed: {error}"
        );
        self.messages
            .push(Message::assistant(self.config.apology_message.clone()));
        self.state = TurnState::Idle;
        Ok(())
    }

    fn complete_turn(&mut self, result: Result<String, GenerationError>) -> TurnOutcome {
        let settled = match result {
            Ok(reply) => self
                .on_generation_success(reply.clone())
                .map(|()| TurnOutcome::Replied(reply)),
            Err(e) => self
                .on_generation_failure(&e)
                .map(|()| TurnOutcome::Failed),
        };

        settled.unwrap_or_else(|e| {
            warn!(session_id = %self.id, "Dropping generation result: {e}");
            TurnOutcome::Ignored
        })
    }

    /// Capture one utterance and submit its transcript
    ///
    /// A no-op while a capture is already running. Capture failures only
    /// reset the listening flag.
    pub async fn listen(&mut self, input: &dyn SpeechInput) -> Result<TurnOutcome, SessionError> {
        if !self.begin_capture() {
            debug!(session_id = %self.id, "Capture already in progress");
            return Ok(TurnOutcome::Ignored);
        }

        let result = {
            let _reset = ListeningReset(&mut self.listening);
            input.capture(&self.config.locale).await
        };

        match self.finish_capture(result) {
            Some(transcript) => self.submit(&transcript).await,
            None => Ok(TurnOutcome::Ignored),
        }
    }

    /// Raise the listening flag; false if it was already raised
    pub fn begin_capture(&mut self) -> bool {
        if self.listening {
            return false;
        }
        self.listening = true;
        true
    }

    /// Lower the listening flag and return a usable transcript, if any
    pub fn finish_capture(&mut self, result: Result<String, CaptureError>) -> Option<String> {
        self.listening = false;
        match result {
            Ok(transcript) if !transcript.trim().is_empty() => {
                debug!(session_id = %self.id, "Captured {} chars of speech", transcript.len());
                Some(transcript)
            }
            Ok(_) => {
                debug!(session_id = %self.id, "Capture returned an empty transcript");
                None
            }
            Err(e) => {
                warn!(session_id = %self.id, "Speech capture failed: {e}");
                None
            }
        }
    }

    /// Empty the message log; preferences are kept
    pub fn clear_conversation(&mut self) {
        debug!(session_id = %self.id, "Clearing {} messages", self.messages.len());
        self.messages.clear();
    }

    /// Reset every preference field and persist the empty record
    pub fn clear_preferences(&mut self) {
        info!(session_id = %self.id, "Clearing preferences");
        self.preferences = PreferenceRecord::default();
        self.store.save(&self.preferences);
    }
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("id", &self.id)
            .field("messages", &self.messages.len())
            .field("preferences", &self.preferences)
            .field("state", &self.state)
            .field("listening", &self.listening)
            .finish_non_exhaustive()
    }
}

/// Settles an in-flight turn as cancelled if the submit future is dropped
struct PendingReplyGuard<'a> {
    session: &'a mut ConversationSession,
    settled: bool,
}

impl Drop for PendingReplyGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let _ = self.session.on_generation_failure(&GenerationError::Cancelled);
        }
    }
}

struct ListeningReset<'a>(&'a mut bool);

impl Drop for ListeningReset<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}
