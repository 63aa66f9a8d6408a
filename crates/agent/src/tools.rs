use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use shelfsense_core::schema::{sql_literal, SchemaContract, PRODUCTS_TABLE};
use shelfsense_db::{QueryError, ReadOnlyStore};
use thiserror::Error;

pub const QUERY_TOOL: &str = "sql_db_query";
pub const LIST_TABLES_TOOL: &str = "sql_db_list_tables";
pub const SCHEMA_TOOL: &str = "sql_db_schema";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Query(#[from] QueryError),
    #[error(
        "product-level queries must join the products table and exclude non-product items; add this filter to your WHERE clause: {predicate}"
    )]
    ExclusionMissing { predicate: String, missing: Vec<String> },
    #[error("invalid tool input: {0}")]
    InvalidInput(String),
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: &str) -> Result<String, ToolError>;
}

/// Tools by name, remembering registration order for the prompt catalogue.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    order: Vec<&'static str>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        let name = tool.name();
        if self.tools.insert(name.to_string(), Box::new(tool)).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|tool| tool.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.order.clone()
    }

    pub fn descriptions(&self) -> Vec<(&'static str, &'static str)> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(*name).map(|tool| (*name, tool.description())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// The three database tools, all bound to the same read-only store.
pub fn sql_toolkit(
    store: Arc<ReadOnlyStore>,
    contract: SchemaContract,
    enforce_exclusions: bool,
) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    registry.register(QueryTool { store: Arc::clone(&store), contract, enforce_exclusions });
    registry.register(SchemaTool { store: Arc::clone(&store) });
    registry.register(ListTablesTool { store });
    registry
}

fn clean_input(input: &str) -> &str {
    let trimmed = input.trim();
    let unfenced = trimmed
        .strip_prefix("```sql")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end_matches("```"))
        .unwrap_or(trimmed);
    unfenced.trim().trim_matches('`').trim()
}

fn sql_words(sql: &str) -> Vec<String> {
    sql.split(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_uppercase)
        .collect()
}

/// Grouping or ordering over items, identified by description or stock code.
fn lists_products(words: &[String]) -> bool {
    let names_items = words.iter().any(|word| word == "DESCRIPTION" || word == "STOCKCODE");
    let groups_or_orders = words
        .windows(2)
        .any(|pair| (pair[0] == "GROUP" || pair[0] == "ORDER") && pair[1] == "BY");
    names_items && groups_or_orders
}

/// Exclusion literals a product-listing query leaves out. A listing that never
/// reads the products table cannot filter on descriptions, so every literal is
/// reported missing. Queries that do not list products are not checked.
pub fn missing_exclusions(sql: &str, contract: &SchemaContract) -> Vec<String> {
    let words = sql_words(sql);
    if !lists_products(&words) {
        return Vec::new();
    }
    let reads_products = words.iter().any(|word| word.eq_ignore_ascii_case(PRODUCTS_TABLE));
    contract
        .exclusions
        .iter()
        .filter(|item| !reads_products || !sql.contains(&sql_literal(item)))
        .map(|item| item.to_string())
        .collect()
}

pub struct QueryTool {
    store: Arc<ReadOnlyStore>,
    contract: SchemaContract,
    enforce_exclusions: bool,
}

#[async_trait]
impl Tool for QueryTool {
    fn name(&self) -> &'static str {
        QUERY_TOOL
    }

    fn description(&self) -> &'static str {
        "Input to this tool is a detailed and correct SQL query, output is a result from the \
         database. If the query is not correct, an error message will be returned. If an error is \
         returned, rewrite the query, check the query, and try again. If you encounter an issue \
         with Unknown column 'xxxx' in 'field list', use sql_db_schema to query the correct table \
         fields."
    }

    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let sql = clean_input(input);
        if sql.is_empty() {
            return Err(ToolError::InvalidInput("expected a SQL query".to_string()));
        }
        if self.enforce_exclusions {
            let missing = missing_exclusions(sql, &self.contract);
            if !missing.is_empty() {
                return Err(ToolError::ExclusionMissing {
                    predicate: self.contract.exclusion_predicate(None),
                    missing,
                });
            }
        }
        let output = self.store.execute(sql).await?;
        Ok(output.render())
    }
}

pub struct SchemaTool {
    store: Arc<ReadOnlyStore>,
}

#[async_trait]
impl Tool for SchemaTool {
    fn name(&self) -> &'static str {
        SCHEMA_TOOL
    }

    fn description(&self) -> &'static str {
        "Input to this tool is a comma-separated list of tables, output is the schema and sample \
         rows for those tables. Be sure that the tables actually exist by calling \
         sql_db_list_tables first! Example Input: table1, table2, table3"
    }

    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let names = clean_input(input)
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();
        if names.is_empty() {
            return Err(ToolError::InvalidInput("expected at least one table name".to_string()));
        }
        Ok(self.store.table_info(&names).await?)
    }
}

pub struct ListTablesTool {
    store: Arc<ReadOnlyStore>,
}

#[async_trait]
impl Tool for ListTablesTool {
    fn name(&self) -> &'static str {
        LIST_TABLES_TOOL
    }

    fn description(&self) -> &'static str {
        "Input is an empty string, output is a comma-separated list of tables in the database."
    }

    async fn execute(&self, _input: &str) -> Result<String, ToolError> {
        Ok(self.store.list_tables().await?.join(", "))
    }
}
