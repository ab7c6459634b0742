//! User preference profile
//!
//! Holds the persisted preference record, the vocabulary-driven
//! extractor that grows it, and the store that persists it.

pub mod extractor;
pub mod store;
pub mod types;

pub use extractor::{
    LANGUAGES, Matcher, PROJECT_TYPES, PreferenceExtractor, SubstringMatcher, TOOLS, Vocabulary,
    WordMatcher,
};
pub use store::{FileKvStore, KeyValueStore, MemoryKvStore, PreferenceStore, StoreError};
pub use types::{EMPTY_SUMMARY, KeywordSet, PreferenceRecord};
