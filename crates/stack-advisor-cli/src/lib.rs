pub mod commands;
pub mod context;
pub mod error;
pub mod output;

pub use commands::{AskCommand, ChatCommand, ConfigCommand, PrefsCommand};
pub use context::AppContext;
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, format_timestamp, preferences_table};
