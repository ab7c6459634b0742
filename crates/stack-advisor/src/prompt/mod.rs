//! Context-aware prompt composition
//!
//! Renders the single outbound prompt for a turn from the user's message
//! and the current preference record.

pub mod prompts;

use crate::preferences::PreferenceRecord;
use prompts::{CLOSING, LANGUAGES_SENTENCE, OPENING, PROJECT_TYPE_SENTENCE, TOOLS_SENTENCE};

/// Deterministic prompt template
///
/// Identical inputs always render byte-identical prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptComposer;

impl PromptComposer {
    pub fn new() -> Self {
        Self
    }

    /// Render the prompt for `message` given what is known about the user
    ///
    /// Language, tool and project type sentences are only included when the
    /// record holds data for them; the opening and closing always are.
    pub fn compose(&self, message: &str, preferences: &PreferenceRecord) -> String {
        let mut prompt = OPENING.replace("{message}", message);

        if !preferences.preferred_languages.is_empty() {
            prompt.push_str(
                &LANGUAGES_SENTENCE
                    .replace("{languages}", &preferences.preferred_languages.join(", ")),
            );
        }

        if !preferences.previous_tools.is_empty() {
            prompt.push_str(
                &TOOLS_SENTENCE.replace("{tools}", &preferences.previous_tools.join(", ")),
            );
        }

        if let Some(project_type) = &preferences.last_project_type {
            prompt.push_str(&PROJECT_TYPE_SENTENCE.replace("{project_type}", project_type));
        }

        prompt.push_str(CLOSING);
        prompt
    }
}
