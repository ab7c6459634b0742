use std::io::Write;

use clap::Parser;
use stack_advisor::session::{ConversationSession, Message, Sender, TurnOutcome};
use stack_advisor::speech::SpeechInput;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio_util::sync::CancellationToken;

use crate::commands::ask::cancel_on_ctrl_c;
use crate::context::AppContext;
use crate::error::CliResult;
use crate::output::{OutputFormat, format_timestamp, preferences_table};

const HELP: &str = "Commands: /listen (voice input), /clear (clear chat), /prefs (show profile), \
/forget (clear profile), /quit";

#[derive(Parser, Default)]
pub struct ChatCommand {
    #[clap(long, help = "Hide message timestamps")]
    pub no_timestamps: bool,
}

/// What the loop should do with one input line
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Message(&'a str),
    Listen,
    Clear,
    Prefs,
    Forget,
    Help,
    Quit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> ChatInput<'_> {
    let trimmed = line.trim();
    if !trimmed.starts_with('/') {
        return ChatInput::Message(line);
    }
    match trimmed {
        "/listen" => ChatInput::Listen,
        "/clear" => ChatInput::Clear,
        "/prefs" => ChatInput::Prefs,
        "/forget" => ChatInput::Forget,
        "/help" => ChatInput::Help,
        "/quit" | "/exit" => ChatInput::Quit,
        other => ChatInput::Unknown(other),
    }
}

/// Read the next line, or `None` on end of input or once `interrupt` resolves
///
/// Ctrl-C at the prompt ends the chat; during a turn it only cancels the
/// pending reply.
async fn next_line_or_interrupt<R, F>(
    lines: &mut Lines<R>,
    interrupt: F,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future,
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = interrupt => Ok(None),
    }
}

impl ChatCommand {
    pub async fn execute(&self, context: &AppContext, format: OutputFormat) -> CliResult<()> {
        let mut session = context.open_session()?;
        let speech_input = context.speech_input();

        println!("Tech Stack Advisor");
        for line in session.preferences().summary_lines() {
            println!("  {line}");
        }
        if !session.is_persisting() {
            println!("  (preferences will not be saved this session)");
        }
        println!("{HELP}\n");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = next_line_or_interrupt(&mut lines, tokio::signal::ctrl_c()).await?
            else {
                println!();
                break;
            };

            match parse_input(&line) {
                ChatInput::Message(text) => {
                    let shown = session.messages().len();
                    let cancel = CancellationToken::new();
                    let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
                    let outcome = session.submit_with_cancel(text, cancel).await;
                    watcher.abort();

                    if outcome? != TurnOutcome::Ignored {
                        self.print_new(&session, shown, false, format)?;
                    }
                }
                ChatInput::Listen => self.listen(&mut session, speech_input.as_ref(), format).await?,
                ChatInput::Clear => {
                    session.clear_conversation();
                    println!("Conversation cleared.");
                }
                ChatInput::Prefs => {
                    if session.preferences().is_empty() {
                        for line in session.preferences().summary_lines() {
                            println!("{line}");
                        }
                    } else {
                        println!("{}", preferences_table(session.preferences()));
                    }
                }
                ChatInput::Forget => {
                    session.clear_preferences();
                    println!("Preferences cleared.");
                }
                ChatInput::Help => println!("{HELP}"),
                ChatInput::Quit => break,
                ChatInput::Unknown(command) => {
                    println!("Unknown command {command}. {HELP}");
                }
            }
        }

        Ok(())
    }

    async fn listen(
        &self,
        session: &mut ConversationSession,
        input: &dyn SpeechInput,
        format: OutputFormat,
    ) -> CliResult<()> {
        println!("Listening...");
        let shown = session.messages().len();

        match session.listen(input).await? {
            TurnOutcome::Ignored => println!("Nothing captured."),
            _ => self.print_new(session, shown, true, format)?,
        }
        Ok(())
    }

    /// Print the messages appended since `from`
    ///
    /// Typed input is already on screen, so user messages are only shown
    /// when `show_user` is set (voice input).
    fn print_new(
        &self,
        session: &ConversationSession,
        from: usize,
        show_user: bool,
        format: OutputFormat,
    ) -> CliResult<()> {
        for message in session.messages().iter().skip(from) {
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string(message)?),
                OutputFormat::Table if message.sender == Sender::User && !show_user => {}
                OutputFormat::Table => println!("{}", self.render(message)),
            }
        }
        Ok(())
    }

    fn render(&self, message: &Message) -> String {
        if self.no_timestamps {
            format!("{}: {}", message.sender.label(), message.text)
        } else {
            format!(
                "[{}] {}: {}",
                format_timestamp(&message.timestamp),
                message.sender.label(),
                message.text
            )
        }
    }
}
