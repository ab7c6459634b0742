//! Vocabulary-driven preference extraction
//!
//! Scans a message against fixed vocabularies of languages, tools and
//! project types. Matching is deliberately naive (lower-cased containment)
//! and sits behind the `Matcher` trait so vocabularies and strategies can
//! be swapped without touching the merge logic.

use tracing::debug;

use crate::config::{ExtractionConfig, MatchingMode};
use crate::preferences::types::PreferenceRecord;

/// Built-in programming language vocabulary
pub const LANGUAGES: &[&str] = &[
    "JavaScript",
    "Python",
    "Java",
    "C#",
    "PHP",
    "Ruby",
    "Go",
    "TypeScript",
];

/// Built-in tool/framework vocabulary
pub const TOOLS: &[&str] = &[
    "React", "Angular", "Vue", "Django", "Flask", "Laravel", "Express", "Spring",
];

/// Built-in project type vocabulary, in priority order
pub const PROJECT_TYPES: &[&str] = &[
    "social media",
    "e-commerce",
    "blog",
    "dashboard",
    "mobile app",
    "API",
];

#[derive(Debug, Clone)]
struct Term {
    canonical: String,
    lowered: String,
}

/// An ordered list of terms, each kept with its canonical spelling
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: Vec<Term>,
}

impl Vocabulary {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocabulary = Self::default();
        vocabulary.extend(terms);
        vocabulary
    }

    /// Append terms, skipping blanks and case-insensitive duplicates
    pub fn extend<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for term in terms {
            let canonical = term.into().trim().to_string();
            let lowered = canonical.to_lowercase();
            if lowered.is_empty() || self.terms.iter().any(|t| t.lowered == lowered) {
                continue;
            }
            self.terms.push(Term { canonical, lowered });
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter()
    }
}

/// Strategy that locates vocabulary terms in a lower-cased message
pub trait Matcher: Send + Sync {
    /// Canonical spellings of every term found, in vocabulary order
    fn find_all(&self, lowered: &str) -> Vec<String>;

    /// Canonical spelling of the first vocabulary term found
    fn find_first(&self, lowered: &str) -> Option<String> {
        self.find_all(lowered).into_iter().next()
    }
}

/// Plain substring containment: "django" contains "go"
#[derive(Debug, Clone)]
pub struct SubstringMatcher {
    vocabulary: Vocabulary,
}

impl SubstringMatcher {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }
}

impl Matcher for SubstringMatcher {
    fn find_all(&self, lowered: &str) -> Vec<String> {
        self.vocabulary
            .iter()
            .filter(|t| lowered.contains(&t.lowered))
            .map(|t| t.canonical.clone())
            .collect()
    }

    fn find_first(&self, lowered: &str) -> Option<String> {
        self.vocabulary
            .iter()
            .find(|t| lowered.contains(&t.lowered))
            .map(|t| t.canonical.clone())
    }
}

/// Substring containment bounded by non-alphanumeric characters on both sides
#[derive(Debug, Clone)]
pub struct WordMatcher {
    vocabulary: Vocabulary,
}

impl WordMatcher {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    fn contains_word(haystack: &str, needle: &str) -> bool {
        haystack.match_indices(needle).any(|(start, _)| {
            let before = haystack[..start].chars().next_back();
            let after = haystack[start + needle.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
    }
}

impl Matcher for WordMatcher {
    fn find_all(&self, lowered: &str) -> Vec<String> {
        self.vocabulary
            .iter()
            .filter(|t| Self::contains_word(lowered, &t.lowered))
            .map(|t| t.canonical.clone())
            .collect()
    }
}

fn build_matcher(mode: MatchingMode, vocabulary: Vocabulary) -> Box<dyn Matcher> {
    match mode {
        MatchingMode::Substring => Box::new(SubstringMatcher::new(vocabulary)),
        MatchingMode::Word => Box::new(WordMatcher::new(vocabulary)),
    }
}

/// Derives updated preference records from inbound messages
pub struct PreferenceExtractor {
    languages: Box<dyn Matcher>,
    tools: Box<dyn Matcher>,
    project_types: Box<dyn Matcher>,
}

impl PreferenceExtractor {
    /// Create an extractor from explicit matchers
    pub fn new(
        languages: Box<dyn Matcher>,
        tools: Box<dyn Matcher>,
        project_types: Box<dyn Matcher>,
    ) -> Self {
        Self {
            languages,
            tools,
            project_types,
        }
    }

    /// Built-in vocabularies extended with the configured extras
    pub fn from_config(config: &ExtractionConfig) -> Self {
        let mut languages = Vocabulary::new(LANGUAGES.iter().copied());
        languages.extend(config.extra_languages.iter().cloned());

        let mut tools = Vocabulary::new(TOOLS.iter().copied());
        tools.extend(config.extra_tools.iter().cloned());

        let mut project_types = Vocabulary::new(PROJECT_TYPES.iter().copied());
        project_types.extend(config.extra_project_types.iter().cloned());

        Self::new(
            build_matcher(config.matching, languages),
            build_matcher(config.matching, tools),
            build_matcher(config.matching, project_types),
        )
    }

    /// Merge the facts found in `message` into a copy of `current`
    ///
    /// Languages and tools are unioned into their sets; the first project
    /// type in vocabulary order replaces the previous one. The input is
    /// never modified and `project_requirements` is carried over as is.
    pub fn extract(&self, message: &str, current: &PreferenceRecord) -> PreferenceRecord {
        let lowered = message.to_lowercase();
        let mut updated = current.clone();

        let languages = self.languages.find_all(&lowered);
        let tools = self.tools.find_all(&lowered);
        let project_type = self.project_types.find_first(&lowered);

        if !languages.is_empty() || !tools.is_empty() || project_type.is_some() {
            debug!(
                ?languages,
                ?tools,
                ?project_type,
                "Extracted preferences from message"
            );
        }

        updated.preferred_languages.extend(languages);
        updated.previous_tools.extend(tools);
        if let Some(project_type) = project_type {
            updated.last_project_type = Some(project_type);
        }

        updated
    }
}

impl Default for PreferenceExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}

impl std::fmt::Debug for PreferenceExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceExtractor").finish_non_exhaustive()
    }
}
