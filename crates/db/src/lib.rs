pub mod analytics;
pub mod connection;
pub mod fixtures;
pub mod store;

pub use analytics::{CustomerSpending, ProductSales, SalesAnalytics, SalesKpis, SPENDING_CEILING};
pub use connection::{
    is_read_only_error, open_ingest, open_read_only, query_only_enabled, DbPool,
};
pub use fixtures::{seed_demo_store, SeedSummary};
pub use store::{QueryError, QueryOutput, ReadOnlyStore};
