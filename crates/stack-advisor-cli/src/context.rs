//! Wiring from configuration to session collaborators

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stack_advisor::config::Config;
use stack_advisor::generation::{GeminiClient, GenerationProvider};
use stack_advisor::preferences::{
    FileKvStore, KeyValueStore, MemoryKvStore, PreferenceExtractor, PreferenceStore,
};
use stack_advisor::session::ConversationSession;
use stack_advisor::speech::{self, SpeechInput};

use crate::error::CliResult;

/// Resolved configuration plus the command-line overrides
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub ephemeral: bool,
}

impl AppContext {
    pub fn load(
        config_path: Option<&Path>,
        data_dir: Option<PathBuf>,
        ephemeral: bool,
    ) -> CliResult<Self> {
        let mut config = Config::load(config_path)?;
        if let Some(data_dir) = data_dir {
            config.storage.data_dir = data_dir;
        }
        Ok(Self { config, ephemeral })
    }

    /// Preference store over the data directory, or process memory with `--ephemeral`
    pub fn preference_store(&self) -> PreferenceStore {
        let backend: Box<dyn KeyValueStore> = if self.ephemeral {
            Box::new(MemoryKvStore::new())
        } else {
            Box::new(FileKvStore::new(&self.config.storage.data_dir))
        };
        PreferenceStore::new(backend, self.config.storage.preferences_key.clone())
    }

    pub fn generator(&self) -> CliResult<Arc<dyn GenerationProvider>> {
        let client = GeminiClient::new(&self.config.generation).map_err(|e| {
            format!(
                "{e}. Export your API key, e.g. `export {}=...`",
                self.config.generation.api_key_env
            )
        })?;
        Ok(Arc::new(client))
    }

    pub fn speech_input(&self) -> Box<dyn SpeechInput> {
        speech::input_from_config(&self.config.speech)
    }

    /// Start a session with every collaborator taken from the configuration
    pub fn open_session(&self) -> CliResult<ConversationSession> {
        tracing::debug!(
            data_dir = %self.config.storage.data_dir.display(),
            ephemeral = self.ephemeral,
            "Opening session"
        );
        let session = ConversationSession::new(
            self.preference_store(),
            self.generator()?,
            speech::output_from_config(&self.config.speech),
            self.config.session.clone(),
        )
        .with_extractor(PreferenceExtractor::from_config(&self.config.extraction));
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_advisor::preferences::PreferenceRecord;

    fn context_in(dir: &Path, ephemeral: bool) -> AppContext {
        let config_path = dir.join("config.toml");
        std::fs::write(&config_path, "").unwrap();
        AppContext::load(Some(&config_path), Some(dir.join("data")), ephemeral).unwrap()
    }

    #[test]
    fn test_data_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let context = context_in(dir.path(), false);
        assert_eq!(context.config.storage.data_dir, dir.path().join("data"));
    }

    #[test]
    fn test_file_store_persists_between_contexts() {
        let dir = tempfile::tempdir().unwrap();
        let record = PreferenceRecord {
            previous_tools: ["Flask"].into_iter().collect(),
            ..Default::default()
        };

        context_in(dir.path(), false).preference_store().save(&record);
        assert_eq!(
            context_in(dir.path(), false).preference_store().load(),
            record
        );
        assert!(dir.path().join("data").join("techStackPreferences.json").exists());
    }

    #[test]
    fn test_ephemeral_store_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let record = PreferenceRecord {
            previous_tools: ["Flask"].into_iter().collect(),
            ..Default::default()
        };

        context_in(dir.path(), true).preference_store().save(&record);
        assert!(!dir.path().join("data").exists());
    }

    #[test]
    fn test_unreadable_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");

        let err = AppContext::load(Some(&missing), None, false).unwrap_err();
        assert!(err.to_string().starts_with("Configuration error: Failed to read config file"));
    }

    #[test]
    fn test_missing_api_key_names_env_var() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = context_in(dir.path(), true);
        context.config.generation.api_key_env = "STACK_ADVISOR_CLI_UNSET_KEY".to_string();

        let err = context.generator().err().unwrap();
        assert!(err.to_string().contains("export STACK_ADVISOR_CLI_UNSET_KEY="));
    }
}
