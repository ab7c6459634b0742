//! Prompt fragments for context-aware recommendation requests
//!
//! Each fragment is filled by plain placeholder replacement.

/// Opening line; always present
///
/// Placeholder: {message} - the user's message, verbatim
pub const OPENING: &str =
    "You are a technology stack recommendation assistant. The user is asking: \"{message}\"\n\n";

/// Placeholder: {languages} - comma-joined preferred languages
pub const LANGUAGES_SENTENCE: &str =
    "The user has previously worked with these languages: {languages}. ";

/// Placeholder: {tools} - comma-joined tools and frameworks
pub const TOOLS_SENTENCE: &str =
    "They have experience with these tools/frameworks: {tools}. ";

/// Placeholder: {project_type} - the last detected project type
pub const PROJECT_TYPE_SENTENCE: &str =
    "Their last project was a {project_type} application. ";

/// Closing instructions; always present
pub const CLOSING: &str = "Provide detailed, personalized recommendations with explanations. \
Mention alternatives and trade-offs. \
If they're asking about updates or comparisons, check for the latest versions and trends. \
Keep the answer conversational and no longer than 6-7 lines.";
