use clap::{Parser, Subcommand};
use stack_advisor::preferences::{EMPTY_SUMMARY, PreferenceRecord};

use crate::context::AppContext;
use crate::error::CliResult;
use crate::output::{OutputFormat, preferences_table};

#[derive(Parser)]
pub struct PrefsCommand {
    #[clap(subcommand)]
    pub command: PrefsSubcommand,
}

#[derive(Subcommand)]
pub enum PrefsSubcommand {
    #[clap(about = "Show the saved preference profile")]
    Show,

    #[clap(about = "Forget every saved preference")]
    Clear,
}

impl PrefsCommand {
    pub fn execute(&self, context: &AppContext, format: OutputFormat) -> CliResult<()> {
        match &self.command {
            PrefsSubcommand::Show => Self::show(context, format),
            PrefsSubcommand::Clear => Self::clear(context, format),
        }
    }

    fn show(context: &AppContext, format: OutputFormat) -> CliResult<()> {
        let mut store = context.preference_store();
        let record = store.load();

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            OutputFormat::Table => {
                if record.is_empty() {
                    println!("{EMPTY_SUMMARY}");
                    return Ok(());
                }
                println!("{}", preferences_table(&record));
            }
        }

        if store.is_degraded() {
            return Err(format!(
                "Could not read preferences under {}",
                context.config.storage.data_dir.display()
            )
            .into());
        }
        Ok(())
    }

    fn clear(context: &AppContext, format: OutputFormat) -> CliResult<()> {
        let mut store = context.preference_store();
        store.save(&PreferenceRecord::default());

        if store.is_degraded() {
            return Err(format!(
                "Failed to clear preferences under {}",
                context.config.storage.data_dir.display()
            )
            .into());
        }

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "key": store.key(),
                    "cleared": true,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => println!("Preferences cleared."),
        }

        Ok(())
    }
}
