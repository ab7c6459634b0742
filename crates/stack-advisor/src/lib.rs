//! Stack Advisor - personalization layer for a tech stack assistant
//!
//! This crate infers a user's technical preferences from free-text
//! messages, folds them into the prompts sent to a text-generation
//! backend, and persists them across sessions.

pub mod config;
pub mod error;
pub mod generation;
pub mod preferences;
pub mod prompt;
pub mod session;
pub mod speech;
pub mod testing;

pub use error::AdvisorError;
