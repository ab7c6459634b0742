use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use stack_advisor::config::{Config, MatchingMode};

use crate::context::AppContext;
use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ConfigCommand {
    #[clap(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    #[clap(about = "Show the effective configuration")]
    Show,
}

impl ConfigCommand {
    pub fn execute(&self, context: &AppContext, format: OutputFormat) -> CliResult<()> {
        match &self.command {
            ConfigSubcommand::Show => Self::show(&context.config, context.ephemeral, format),
        }
    }

    fn show(config: &Config, ephemeral: bool, format: OutputFormat) -> CliResult<()> {
        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Setting", "Value"]);

                let data_dir = if ephemeral {
                    "(memory only)".to_string()
                } else {
                    config.storage.data_dir.display().to_string()
                };
                table.add_row(["storage.data_dir", &data_dir]);
                table.add_row(["storage.preferences_key", &config.storage.preferences_key]);
                table.add_row(["generation.api_url", &config.generation.api_url]);
                table.add_row(["generation.model", &config.generation.model]);
                table.add_row(["generation.api_key_env", &config.generation.api_key_env]);
                table.add_row([
                    "generation.timeout_secs",
                    &config.generation.timeout_secs.to_string(),
                ]);
                table.add_row(["session.locale", &config.session.locale]);
                table.add_row(["session.apology_message", &config.session.apology_message]);
                table.add_row([
                    "session.reply_timeout_secs",
                    &config.session.reply_timeout_secs.to_string(),
                ]);
                let matching = match config.extraction.matching {
                    MatchingMode::Substring => "substring",
                    MatchingMode::Word => "word",
                };
                table.add_row(["extraction.matching", matching]);
                table.add_row([
                    "extraction.extra_languages",
                    &config.extraction.extra_languages.join(", "),
                ]);
                table.add_row([
                    "extraction.extra_tools",
                    &config.extraction.extra_tools.join(", "),
                ]);
                table.add_row([
                    "extraction.extra_project_types",
                    &config.extraction.extra_project_types.join(", "),
                ]);
                table.add_row([
                    "speech.output_command",
                    &format_command(config.speech.output_command.as_deref()),
                ]);
                table.add_row([
                    "speech.input_command",
                    &format_command(config.speech.input_command.as_deref()),
                ]);

                println!("{table}");
            }
        }

        Ok(())
    }
}

fn format_command(argv: Option<&[String]>) -> String {
    match argv {
        Some(argv) if !argv.is_empty() => argv.join(" "),
        _ => "-".to_string(),
    }
}
