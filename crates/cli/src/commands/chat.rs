use std::sync::Arc;

use anyhow::Result;
use shelfsense_agent::{Assistant, ChatRole, Conversation, Planner};
use shelfsense_core::audit::TracingAuditSink;
use shelfsense_core::config::LoadOptions;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::commands::{CommandContext, CommandResult, EXIT_RUNTIME};

const PROMPT: &str = "> ";
const EXIT_WORDS: [&str; 2] = ["exit", "quit"];

pub fn run(options: LoadOptions) -> CommandResult {
    let context = match CommandContext::prepare("chat", options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    context.runtime.block_on(async {
        let store = match context.open_store("chat").await {
            Ok(store) => store,
            Err(failure) => return failure,
        };
        let assistant =
            Assistant::from_config(&context.config, store.clone(), Arc::new(TracingAuditSink)).await;

        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let result = run_session(&assistant, stdin, &mut stdout).await;
        store.close().await;

        match result {
            Ok(conversation) => {
                let questions =
                    conversation.messages().iter().filter(|turn| turn.role == ChatRole::User).count();
                CommandResult::success("chat", format!("chat ended after {questions} question(s)"))
            }
            Err(error) => CommandResult::failure(
                "chat",
                "terminal_io",
                format!("chat session aborted: {error}"),
                EXIT_RUNTIME,
            ),
        }
    })
}

/// Reads one question per line until EOF or an exit word, writing each reply.
pub async fn run_session<P, R, W>(
    assistant: &Assistant<P>,
    reader: R,
    writer: &mut W,
) -> Result<Conversation>
where
    P: Planner,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut conversation = Conversation::new();
    if let Some(greeting) = conversation.last_reply() {
        writer.write_all(format!("{greeting}\n").as_bytes()).await?;
    }

    let mut lines = reader.lines();
    loop {
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&question.to_ascii_lowercase().as_str()) {
            break;
        }

        let (next, reply) = assistant.respond(conversation, question).await;
        conversation = next;
        writer.write_all(format!("{reply}\n").as_bytes()).await?;
    }

    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(conversation)
}
