//! Speech capabilities supplied by the host
//!
//! The session depends only on these traits. Hosts without audio use
//! `SilentSpeech`; the command-backed implementations delegate to external
//! programs (a TTS binary, a one-shot transcription script).

use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SpeechConfig;

/// Environment variable carrying the locale to command-backed programs
pub const LOCALE_ENV: &str = "STACK_ADVISOR_LOCALE";

/// Reasons a single capture produced no transcript
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Microphone permission denied")]
    PermissionDenied,
    #[error("No speech detected")]
    NoSpeech,
    #[error("Speech capture unavailable: {0}")]
    Unavailable(String),
    #[error("Speech capture failed: {0}")]
    Failed(String),
}

/// Single-shot speech-to-text capability
#[async_trait]
pub trait SpeechInput: Send + Sync {
    /// Record one utterance and return its transcript
    async fn capture(&self, locale: &str) -> Result<String, CaptureError>;
}

/// Fire-and-forget text-to-speech capability
pub trait SpeechOutput: Send + Sync {
    /// Start reading `text` aloud; returns without waiting for playback
    fn speak(&self, text: &str, locale: &str);
}

/// No-op speech for hosts without audio
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSpeech;

#[async_trait]
impl SpeechInput for SilentSpeech {
    async fn capture(&self, _locale: &str) -> Result<String, CaptureError> {
        Err(CaptureError::Unavailable("no speech input configured".to_string()))
    }
}

impl SpeechOutput for SilentSpeech {
    fn speak(&self, _text: &str, _locale: &str) {}
}

/// Speaks by spawning a host program with the text as its last argument
#[derive(Debug, Clone)]
pub struct CommandSpeechOutput {
    program: String,
    args: Vec<String>,
}

impl CommandSpeechOutput {
    /// Build from an argv list; `None` when the list is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl SpeechOutput for CommandSpeechOutput {
    fn speak(&self, text: &str, locale: &str) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, skipping speech output via {}", self.program);
            return;
        };
        let _entered = runtime.enter();

        let spawned = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .env(LOCALE_ENV, locale)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                debug!("Started speech output via {}", self.program);
                runtime.spawn(async move {
                    if let Err(e) = child.wait().await {
                        warn!("Speech output process failed: {e}");
                    }
                });
            }
            Err(e) => warn!("Failed to start speech output '{}': {e}", self.program),
        }
    }
}

/// Captures by running a host program that prints one transcript to stdout
#[derive(Debug, Clone)]
pub struct CommandSpeechInput {
    program: String,
    args: Vec<String>,
}

impl CommandSpeechInput {
    /// Build from an argv list; `None` when the list is empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl SpeechInput for CommandSpeechInput {
    async fn capture(&self, locale: &str) -> Result<String, CaptureError> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .env(LOCALE_ENV, locale)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    CaptureError::Unavailable(format!("'{}' not found", self.program))
                }
                std::io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
                _ => CaptureError::Failed(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CaptureError::Failed(format!(
                "'{}' exited with {}: {}",
                self.program, output.status, stderr
            )));
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if transcript.is_empty() {
            return Err(CaptureError::NoSpeech);
        }
        Ok(transcript)
    }
}

/// Speech output configured for this host, silent when none is set
pub fn output_from_config(config: &SpeechConfig) -> Box<dyn SpeechOutput> {
    match config.output_command.as_deref().and_then(CommandSpeechOutput::from_argv) {
        Some(output) => Box::new(output),
        None => Box::new(SilentSpeech),
    }
}

/// Speech input configured for this host, unavailable when none is set
pub fn input_from_config(config: &SpeechConfig) -> Box<dyn SpeechInput> {
    match config.input_command.as_deref().and_then(CommandSpeechInput::from_argv) {
        Some(input) => Box::new(input),
        None => Box::new(SilentSpeech),
    }
}
