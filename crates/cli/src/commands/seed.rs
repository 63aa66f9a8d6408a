use shelfsense_core::config::LoadOptions;
use shelfsense_db::{seed_demo_store, SeedSummary};

use crate::commands::{CommandContext, CommandResult, EXIT_DATABASE};

pub fn run(options: LoadOptions) -> CommandResult {
    let context = match CommandContext::prepare("seed", options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    let result = context.runtime.block_on(seed_demo_store(&context.config.database.url));

    match result {
        Ok(summary) => CommandResult::success_with_data(
            "seed",
            seed_message(&summary),
            serde_json::to_value(&summary).ok(),
        ),
        Err(error) => CommandResult::failure(
            "seed",
            "seed_execution",
            format!("failed to load demo dataset: {error}"),
            EXIT_DATABASE,
        ),
    }
}

fn seed_message(summary: &SeedSummary) -> String {
    let state = if summary.inserted { "loaded" } else { "already present" };
    format!(
        "demo dataset {state}: {} products, {} transactions",
        summary.products, summary.transactions
    )
}
