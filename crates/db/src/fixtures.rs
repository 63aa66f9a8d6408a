//! Deterministic demo dataset in the shape the ingestion pipeline produces.
//!
//! Loaded through a separate writable pool; the assistant never sees that pool.

use serde::Serialize;
use shelfsense_core::schema::EXCLUDED_DESCRIPTIONS;
use tracing::info;

use crate::connection::open_ingest;

pub const CREATE_PRODUCTS_SQL: &str = "CREATE TABLE IF NOT EXISTS products (
    StockCode TEXT NOT NULL,
    Description TEXT,
    Price REAL
)";

pub const CREATE_TRANSACTIONS_SQL: &str = "CREATE TABLE IF NOT EXISTS transactions (
    Invoice TEXT NOT NULL,
    StockCode TEXT NOT NULL,
    Quantity INTEGER NOT NULL,
    Price REAL NOT NULL,
    InvoiceDate TEXT NOT NULL,
    CustomerID INTEGER
)";

pub const CREATE_INDEX_SQL: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_trans_stock ON transactions (StockCode)",
    "CREATE INDEX IF NOT EXISTS idx_prod_stock ON products (StockCode)",
];

/// `(StockCode, Description, Price)`
pub const DEMO_PRODUCTS: &[(&str, &str, f64)] = &[
    ("85123A", "WHITE HANGING HEART T-LIGHT HOLDER", 2.55),
    ("71053", "WHITE METAL LANTERN", 3.39),
    ("84406B", "CREAM CUPID HEARTS COAT HANGER", 2.75),
    ("22423", "REGENCY CAKESTAND 3 TIER", 12.75),
    ("47566", "PARTY BUNTING", 4.95),
    ("23084", "RABBIT NIGHT LIGHT", 2.08),
    ("POST", "POSTAGE", 18.0),
    ("DOT", "DOTCOM POSTAGE", 900.0),
    ("M", "Manual", 250.0),
    ("C2", "CARRIAGE", 50.0),
];

/// `(Invoice, StockCode, Quantity, Price, InvoiceDate, CustomerID)`
pub const DEMO_TRANSACTIONS: &[(&str, &str, i64, f64, &str, Option<i64>)] = &[
    ("536365", "85123A", 6, 2.55, "2011-09-01 08:26:00", Some(17850)),
    ("536365", "71053", 6, 3.39, "2011-09-01 08:26:00", Some(17850)),
    ("536366", "22423", 4, 12.75, "2011-09-07 10:12:00", Some(13047)),
    ("536366", "POST", 1, 18.0, "2011-09-07 10:12:00", Some(13047)),
    ("536367", "DOT", 1, 900.0, "2011-09-19 14:40:00", None),
    ("536368", "47566", 12, 4.95, "2011-10-03 09:00:00", Some(12583)),
    ("536368", "84406B", 8, 2.75, "2011-10-03 09:00:00", Some(12583)),
    ("536369", "22423", 2, 12.75, "2011-10-14 16:05:00", Some(17850)),
    ("C536370", "22423", -1, 12.75, "2011-10-15 11:30:00", Some(17850)),
    ("536371", "M", 1, 250.0, "2011-10-21 12:00:00", Some(14688)),
    ("536372", "23084", 24, 2.08, "2011-11-02 13:15:00", Some(14688)),
    ("536372", "85123A", 32, 2.55, "2011-11-02 13:15:00", Some(14688)),
    ("536373", "71053", 12, 3.39, "2011-11-18 15:45:00", Some(13047)),
    ("536374", "DOT", 1, 900.0, "2011-11-20 10:00:00", None),
    ("536375", "C2", 1, 50.0, "2011-11-25 17:20:00", Some(12583)),
    ("536376", "22423", 6, 12.75, "2011-11-28 09:40:00", Some(12583)),
    ("536377", "85123A", 12, 2.55, "2011-12-05 08:10:00", Some(17850)),
    ("536377", "47566", 6, 4.95, "2011-12-05 08:10:00", Some(17850)),
    ("536378", "POST", 2, 18.0, "2011-12-06 11:00:00", Some(13047)),
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub products: i64,
    pub transactions: i64,
    pub inserted: bool,
}

/// Revenue of the demo data after the `Quantity > 0` and exclusion filters.
pub fn demo_expected_revenue() -> f64 {
    DEMO_TRANSACTIONS
        .iter()
        .filter(|(_, stock_code, quantity, _, _, _)| {
            *quantity > 0
                && DEMO_PRODUCTS
                    .iter()
                    .find(|(code, _, _)| code == stock_code)
                    .is_some_and(|(_, description, _)| !EXCLUDED_DESCRIPTIONS.contains(description))
        })
        .map(|(_, _, quantity, price, _, _)| *quantity as f64 * price)
        .sum()
}

/// Creates the schema and loads the demo rows. Does nothing to a store that
/// already holds products.
pub async fn seed_demo_store(database_url: &str) -> Result<SeedSummary, sqlx::Error> {
    let pool = open_ingest(database_url).await?;
    let mut tx = pool.begin().await?;

    sqlx::query(CREATE_PRODUCTS_SQL).execute(&mut *tx).await?;
    sqlx::query(CREATE_TRANSACTIONS_SQL).execute(&mut *tx).await?;
    for statement in CREATE_INDEX_SQL {
        sqlx::query(*statement).execute(&mut *tx).await?;
    }

    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(&mut *tx).await?;
    let inserted = existing == 0;

    if inserted {
        for (stock_code, description, price) in DEMO_PRODUCTS {
            sqlx::query("INSERT INTO products (StockCode, Description, Price) VALUES (?, ?, ?)")
                .bind(*stock_code)
                .bind(*description)
                .bind(*price)
                .execute(&mut *tx)
                .await?;
        }
        for (invoice, stock_code, quantity, price, invoice_date, customer_id) in DEMO_TRANSACTIONS {
            sqlx::query(
                "INSERT INTO transactions (Invoice, StockCode, Quantity, Price, InvoiceDate, CustomerID) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(*invoice)
            .bind(*stock_code)
            .bind(*quantity)
            .bind(*price)
            .bind(*invoice_date)
            .bind(*customer_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    let products: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(&mut *tx).await?;
    let transactions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM transactions").fetch_one(&mut *tx).await?;
    tx.commit().await?;
    pool.close().await;

    info!(
        event_name = "db.fixtures.seeded",
        products,
        transactions,
        inserted,
        "demo inventory store ready"
    );
    Ok(SeedSummary { products, transactions, inserted })
}
