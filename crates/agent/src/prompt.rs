//! Prompt text for the query planner.
//!
//! [`build`] renders the business rules from the schema contract; the planner
//! prompt appends tool descriptions and the reason-act format. Both are pure
//! functions of their inputs.

use shelfsense_core::schema::SchemaContract;

pub const DEFAULT_TOP_K: usize = 10;

pub const FINAL_ANSWER_PREFIX: &str = "Final Answer:";
pub const ACTION_PREFIX: &str = "Action:";
pub const ACTION_INPUT_PREFIX: &str = "Action Input:";
pub const OBSERVATION_PREFIX: &str = "Observation:";
pub const THOUGHT_PREFIX: &str = "Thought:";

/// Business-rule system instruction for the inventory schema.
pub fn build(contract: &SchemaContract) -> String {
    let tables = contract
        .tables
        .iter()
        .map(|table| format!("- '{}' ({})", table.name, table.column_list()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a Data Analyst. You are interacting with a read-only SQLite database.\n\
         \n\
         Tables:\n\
         {tables}\n\
         Tables join on {join_key}.\n\
         \n\
         CRITICAL RULES:\n\
         1. Sales/Revenue = {revenue}.\n\
         2. When listing \"Products\" or \"Best Sellers\", you MUST exclude administrative items.\n   \
            - ALWAYS add this filter to your WHERE clause:\n     \
              {predicate}\n\
         3. Do NOT execute DML statements (INSERT, UPDATE, DELETE, DROP).",
        join_key = contract.join_key,
        revenue = contract.revenue_formula,
        predicate = contract.exclusion_predicate(None),
    )
}

/// Full planner instruction: business rules, tool catalogue and the
/// Thought/Action/Observation protocol.
pub fn planner_prompt(contract: &SchemaContract, tools: &[(&str, &str)], top_k: usize) -> String {
    let catalogue = tools
        .iter()
        .map(|(name, description)| format!("{name}: {description}"))
        .collect::<Vec<_>>()
        .join("\n");
    let names = tools.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ");

    format!(
        "{rules}\n\
         \n\
         Given an input question, create a syntactically correct SQLite query to run, then look at \
         the results of the query and return the answer. Unless the user specifies a specific number \
         of examples they wish to obtain, always limit your query to at most {top_k} results. \
         Only ask for the relevant columns given the question. If you get an error while executing \
         a query, rewrite the query and try again.\n\
         \n\
         You have access to the following tools:\n\
         \n\
         {catalogue}\n\
         \n\
         Use the following format:\n\
         \n\
         Question: the input question you must answer\n\
         {THOUGHT_PREFIX} you should always think about what to do\n\
         {ACTION_PREFIX} the action to take, should be one of [{names}]\n\
         {ACTION_INPUT_PREFIX} the input to the action\n\
         {OBSERVATION_PREFIX} the result of the action\n\
         ... (this Thought/Action/Action Input/Observation can repeat N times)\n\
         {THOUGHT_PREFIX} I now know the final answer\n\
         {FINAL_ANSWER_PREFIX} the final answer to the original input question\n\
         \n\
         Begin!",
        rules = build(contract),
    )
}

/// Opening user turn; the scratchpad of earlier steps follows it.
pub fn question_turn(question: &str, scratchpad: &str) -> String {
    format!(
        "Question: {question}\n{THOUGHT_PREFIX} I should look at the tables in the database to see \
         what I can query. Then I should query the schema of the most relevant tables.\n{scratchpad}"
    )
}

#[cfg(test)]
mod tests {
    use shelfsense_core::schema::{SchemaContract, EXCLUDED_DESCRIPTIONS};

    use super::{build, planner_prompt, question_turn};

    #[test]
    fn rules_carry_schema_formula_and_exclusions_verbatim() {
        let prompt = build(&SchemaContract::inventory());

        assert!(prompt.contains("- 'products' (StockCode, Description, Price)"));
        assert!(prompt.contains(
            "- 'transactions' (Invoice, StockCode, Quantity, Price, InvoiceDate, CustomerID)"
        ));
        assert!(prompt.contains("Sales/Revenue = Quantity * Price."));
        assert!(prompt.contains("ALWAYS add this filter to your WHERE clause"));
        assert!(prompt.contains(
            "Description NOT IN ('POSTAGE', 'DOTCOM POSTAGE', 'CRUK Commission', 'Manual', \
             'Bank Charges', 'Discount', 'SAMPLES', 'AMAZON FEE', 'Adjust bad debt', 'CARRIAGE')"
        ));
        for item in EXCLUDED_DESCRIPTIONS {
            assert!(prompt.contains(item));
        }
        assert!(prompt.contains("Do NOT execute DML statements (INSERT, UPDATE, DELETE, DROP)."));
    }

    #[test]
    fn build_is_deterministic() {
        let contract = SchemaContract::inventory();
        assert_eq!(build(&contract), build(&contract));
    }

    #[test]
    fn planner_prompt_lists_tools_and_protocol() {
        let tools = [
            ("sql_db_query", "Run a SELECT query."),
            ("sql_db_list_tables", "List tables."),
        ];
        let prompt = planner_prompt(&SchemaContract::inventory(), &tools, 10);

        assert!(prompt.contains("sql_db_query: Run a SELECT query."));
        assert!(prompt.contains("should be one of [sql_db_query, sql_db_list_tables]"));
        assert!(prompt.contains("at most 10 results"));
        assert!(prompt.trim_end().ends_with("Begin!"));
    }

    #[test]
    fn question_turn_appends_scratchpad() {
        let turn = question_turn("What is the total revenue?", "Action: sql_db_list_tables\n");
        assert!(turn.starts_with("Question: What is the total revenue?\nThought:"));
        assert!(turn.ends_with("Action: sql_db_list_tables\n"));
    }
}
