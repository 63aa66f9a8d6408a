//! Static contract for the inventory store: the two tables produced by the
//! ingestion pipeline, the revenue formula and the business exclusion list.

use serde::Serialize;

/// Non-merchandise line items (postage, fees, manual adjustments) that never
/// count as product sales.
pub const EXCLUDED_DESCRIPTIONS: [&str; 10] = [
    "POSTAGE",
    "DOTCOM POSTAGE",
    "CRUK Commission",
    "Manual",
    "Bank Charges",
    "Discount",
    "SAMPLES",
    "AMAZON FEE",
    "Adjust bad debt",
    "CARRIAGE",
];

pub const PRODUCTS_TABLE: &str = "products";
pub const TRANSACTIONS_TABLE: &str = "transactions";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: Vec<&'static str>,
}

impl TableSpec {
    pub fn column_list(&self) -> String {
        self.columns.join(", ")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SchemaContract {
    pub tables: Vec<TableSpec>,
    pub join_key: &'static str,
    pub revenue_formula: &'static str,
    pub description_column: &'static str,
    pub exclusions: Vec<&'static str>,
}

impl Default for SchemaContract {
    fn default() -> Self {
        Self::inventory()
    }
}

impl SchemaContract {
    pub fn inventory() -> Self {
        Self {
            tables: vec![
                TableSpec { name: PRODUCTS_TABLE, columns: vec!["StockCode", "Description", "Price"] },
                TableSpec {
                    name: TRANSACTIONS_TABLE,
                    columns: vec![
                        "Invoice",
                        "StockCode",
                        "Quantity",
                        "Price",
                        "InvoiceDate",
                        "CustomerID",
                    ],
                },
            ],
            join_key: "StockCode",
            revenue_formula: "Quantity * Price",
            description_column: "Description",
            exclusions: EXCLUDED_DESCRIPTIONS.to_vec(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|table| table.name.eq_ignore_ascii_case(name))
    }

    /// Exclusion list as SQL string literals: `'POSTAGE', 'DOTCOM POSTAGE', ...`.
    pub fn exclusion_sql_list(&self) -> String {
        self.exclusions
            .iter()
            .map(|item| sql_literal(item))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `<column> NOT IN (<exclusion list>)`, with an optional table alias.
    pub fn exclusion_predicate(&self, alias: Option<&str>) -> String {
        let column = match alias {
            Some(alias) => format!("{alias}.{}", self.description_column),
            None => self.description_column.to_string(),
        };
        format!("{column} NOT IN ({})", self.exclusion_sql_list())
    }

    pub fn is_excluded(&self, description: &str) -> bool {
        self.exclusions.iter().any(|item| *item == description)
    }
}

pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
