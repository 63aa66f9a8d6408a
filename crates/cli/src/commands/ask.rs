use std::sync::Arc;

use shelfsense_agent::Assistant;
use shelfsense_core::audit::TracingAuditSink;
use shelfsense_core::config::LoadOptions;
use uuid::Uuid;

use crate::commands::{CommandContext, CommandResult, EXIT_ASSISTANT};

pub fn run(options: LoadOptions, question: &str) -> CommandResult {
    let context = match CommandContext::prepare("ask", options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    context.runtime.block_on(async {
        let store = match context.open_store("ask").await {
            Ok(store) => store,
            Err(failure) => return failure,
        };
        let assistant =
            Assistant::from_config(&context.config, store.clone(), Arc::new(TracingAuditSink)).await;

        let correlation_id = Uuid::new_v4().to_string();
        let result = assistant.answer(question, &correlation_id).await;
        store.close().await;

        match result {
            Ok(response) => CommandResult::success_with_data(
                "ask",
                response.output.clone(),
                Some(serde_json::json!({
                    "correlation_id": correlation_id,
                    "steps": response.steps,
                    "executed_sql": response.executed_sql,
                })),
            ),
            Err(error) => CommandResult::failure(
                "ask",
                error.error_class(),
                error.user_message(),
                EXIT_ASSISTANT,
            ),
        }
    })
}
