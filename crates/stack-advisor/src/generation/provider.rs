//! Generation provider trait
//!
//! Abstracts the remote text-generation service so sessions can be driven
//! by the HTTP client in production and by scripted doubles in tests.

use async_trait::async_trait;

use crate::generation::types::GenerationError;

/// Trait for text generation backends
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a reply for a fully composed prompt
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Check if the provider is able to serve requests
    async fn is_available(&self) -> bool;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
