//! Text generation backend
//!
//! The session talks to the remote model through the `GenerationProvider`
//! trait; `GeminiClient` is the HTTP implementation.

pub mod gemini;
pub mod provider;
pub mod types;

pub use gemini::GeminiClient;
pub use provider::GenerationProvider;
pub use types::GenerationError;
