//! Test utilities for stack-advisor - scripted collaborators
//!
//! Mocks for the generation backend, the speech capabilities and the
//! key/value store so session behavior can be exercised without network
//! access, audio devices or a writable disk.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::generation::{GenerationError, GenerationProvider};
use crate::preferences::{KeyValueStore, StoreError};
use crate::speech::{CaptureError, SpeechInput, SpeechOutput};

/// Reply returned by `MockGenerator` once its script runs out
pub const DEFAULT_MOCK_REPLY: &str = "Mock reply";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Generation backend that replays scripted results and records prompts
#[derive(Debug, Default)]
pub struct MockGenerator {
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockGenerator {
    /// Always replies with [`DEFAULT_MOCK_REPLY`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `text` on the first call
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_responses(vec![Ok(text.into())])
    }

    /// Fail with `error` on the first call
    pub fn failing(error: GenerationError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    /// Replay `responses` in order, then fall back to the default reply
    pub fn with_responses(responses: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// Sleep before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }
}

#[async_trait]
impl GenerationProvider for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        lock(&self.prompts).push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Ok(DEFAULT_MOCK_REPLY.to_string()))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Speech output that records `(text, locale)` pairs
#[derive(Debug, Clone, Default)]
pub struct RecordingSpeech {
    spoken: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything spoken so far; clones share the same log
    pub fn spoken(&self) -> Vec<(String, String)> {
        lock(&self.spoken).clone()
    }
}

impl SpeechOutput for RecordingSpeech {
    fn speak(&self, text: &str, locale: &str) {
        lock(&self.spoken).push((text.to_string(), locale.to_string()));
    }
}

/// Speech input that replays scripted capture results
#[derive(Debug, Default)]
pub struct ScriptedSpeechInput {
    results: Mutex<VecDeque<Result<String, CaptureError>>>,
    locales: Mutex<Vec<String>>,
}

impl ScriptedSpeechInput {
    /// Replay `results` in order; further captures report `NoSpeech`
    pub fn new(results: Vec<Result<String, CaptureError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            locales: Mutex::new(Vec::new()),
        }
    }

    /// Locales passed to each capture
    pub fn locales(&self) -> Vec<String> {
        lock(&self.locales).clone()
    }
}

#[async_trait]
impl SpeechInput for ScriptedSpeechInput {
    async fn capture(&self, locale: &str) -> Result<String, CaptureError> {
        lock(&self.locales).push(locale.to_string());
        lock(&self.results)
            .pop_front()
            .unwrap_or(Err(CaptureError::NoSpeech))
    }
}

/// Key/value store whose operations fail on demand
#[derive(Debug)]
pub struct FailingKvStore {
    fail_reads: bool,
    write_attempts: AtomicUsize,
}

impl FailingKvStore {
    /// Both reads and writes fail
    pub fn new() -> Self {
        Self {
            fail_reads: true,
            write_attempts: AtomicUsize::new(0),
        }
    }

    /// Reads find nothing; writes fail
    pub fn writes_only() -> Self {
        Self {
            fail_reads: false,
            write_attempts: AtomicUsize::new(0),
        }
    }

    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }
}

impl Default for FailingKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for FailingKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Read {
                key: key.to_string(),
                reason: "storage unavailable".to_string(),
            });
        }
        Ok(None)
    }

    fn set(&self, key: &str, _value: &str) -> Result<(), StoreError> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Write {
            key: key.to_string(),
            reason: "quota exceeded".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_generator_replays_script_then_defaults() {
        let generator = MockGenerator::with_responses(vec![
            Ok("one".to_string()),
            Err(GenerationError::Transport("down".to_string())),
        ]);

        assert_eq!(generator.generate("a").await.unwrap(), "one");
        assert!(generator.generate("b").await.is_err());
        assert_eq!(generator.generate("c").await.unwrap(), DEFAULT_MOCK_REPLY);
        assert_eq!(generator.prompts(), vec!["a", "b", "c"]);
        assert_eq!(generator.call_count(), 3);
    }

    #[test]
    fn recording_speech_clones_share_log() {
        let speech = RecordingSpeech::new();
        let handle = speech.clone();
        speech.speak("hi", "en-US");
        assert_eq!(handle.spoken(), vec![("hi".to_string(), "en-US".to_string())]);
    }

    #[tokio::test]
    async fn scripted_input_runs_out_with_no_speech() {
        let input = ScriptedSpeechInput::new(vec![Ok("Use Go".to_string())]);
        assert_eq!(input.capture("en-GB").await.unwrap(), "Use Go");
        assert_eq!(input.capture("en-GB").await, Err(CaptureError::NoSpeech));
        assert_eq!(input.locales(), vec!["en-GB", "en-GB"]);
    }

    #[test]
    fn failing_store_counts_writes() {
        let store = FailingKvStore::writes_only();
        assert!(store.get("k").unwrap().is_none());
        assert!(store.set("k", "v").is_err());
        assert!(store.set("k", "v").is_err());
        assert_eq!(store.write_attempts(), 2);
        assert!(FailingKvStore::new().get("k").is_err());
    }
}
