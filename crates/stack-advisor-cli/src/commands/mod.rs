pub mod ask;
pub mod chat;
pub mod config;
pub mod prefs;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use config::ConfigCommand;
pub use prefs::PrefsCommand;
