use clap::Parser;
use stack_advisor::session::TurnOutcome;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;
use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct AskCommand {
    #[clap(required = true, help = "Message to send")]
    pub message: Vec<String>,
}

impl AskCommand {
    pub async fn execute(&self, context: &AppContext, format: OutputFormat) -> CliResult<()> {
        let message = self.message.join(" ");
        let mut session = context.open_session()?;

        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));
        let outcome = session.submit_with_cancel(&message, cancel).await;
        watcher.abort();

        let reply = match outcome? {
            TurnOutcome::Ignored => return Err("Message is empty".into()),
            TurnOutcome::Replied(reply) => Some(reply),
            TurnOutcome::Failed => None,
        };

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "session_id": session.id().to_string(),
                    "message": message,
                    "reply": reply,
                    "failed": reply.is_none(),
                    "preferences": session.preferences(),
                    "persisted": session.is_persisting(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => match &reply {
                Some(reply) => println!("{reply}"),
                None => {
                    let apology = session
                        .messages()
                        .last()
                        .map(|m| m.text.as_str())
                        .unwrap_or_default();
                    println!("{apology}");
                }
            },
        }

        match reply {
            Some(_) => Ok(()),
            None => Err("Generation failed; see the log for details".into()),
        }
    }
}

/// Cancel `token` on the first Ctrl-C
pub(crate) async fn cancel_on_ctrl_c(token: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        token.cancel();
    }
}
