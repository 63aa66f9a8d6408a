//! Dashboard aggregates over the read-only store.
//!
//! Every query joins transactions to products, keeps only `Quantity > 0` and
//! applies the exclusion list, so non-merchandise lines never reach a KPI, the
//! monthly history, the best-seller ranking or the customer spending spread.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::Value;
use shelfsense_core::forecast::{next_month, MonthlySales};
use shelfsense_core::schema::{sql_literal, SchemaContract};
use tracing::debug;

use crate::store::{decode_row, QueryError, ReadOnlyStore};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SalesKpis {
    pub total_revenue: f64,
    pub total_orders: i64,
    pub items_sold: i64,
    /// Absent when there are no orders.
    pub average_order_value: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductSales {
    pub description: String,
    pub revenue: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CustomerSpending {
    pub customer_id: i64,
    pub total: f64,
}

/// Customers at or above this total are left out of the spending distribution.
pub const SPENDING_CEILING: f64 = 5000.0;

pub struct SalesAnalytics {
    store: Arc<ReadOnlyStore>,
    contract: SchemaContract,
}

impl SalesAnalytics {
    pub fn new(store: Arc<ReadOnlyStore>, contract: SchemaContract) -> Self {
        Self { store, contract }
    }

    fn base_filter(&self) -> String {
        format!("t.Quantity > 0 AND {}", self.contract.exclusion_predicate(Some("p")))
    }

    pub async fn kpis(&self) -> Result<SalesKpis, QueryError> {
        let sql = format!(
            "SELECT TOTAL(t.Quantity * t.Price) AS revenue, \
                    COUNT(DISTINCT t.Invoice) AS orders, \
                    TOTAL(t.Quantity) AS items \
             FROM transactions t JOIN products p ON t.StockCode = p.StockCode \
             WHERE {}",
            self.base_filter()
        );
        let rows = self.store.fetch_rows(&sql).await?;
        let values = match rows.first() {
            Some(row) => decode_row(row)?,
            None => Vec::new(),
        };

        let total_revenue = number_at(&values, 0);
        let total_orders = number_at(&values, 1) as i64;
        let items_sold = number_at(&values, 2) as i64;
        let average_order_value =
            (total_orders > 0).then(|| total_revenue / total_orders as f64);

        debug!(event_name = "analytics.kpis", total_orders, items_sold, "computed sales kpis");
        Ok(SalesKpis { total_revenue, total_orders, items_sold, average_order_value })
    }

    /// Monthly totals in calendar order; months without sales inside the range
    /// are reported as zero. Rows on or after `cutoff` are left out.
    pub async fn monthly_sales(
        &self,
        cutoff: Option<NaiveDate>,
    ) -> Result<Vec<MonthlySales>, QueryError> {
        let cutoff_clause = cutoff
            .map(|date| {
                format!(" AND t.InvoiceDate < {}", sql_literal(&date.format("%Y-%m-%d").to_string()))
            })
            .unwrap_or_default();
        let sql = format!(
            "SELECT strftime('%Y-%m', t.InvoiceDate) AS month, \
                    TOTAL(t.Quantity * t.Price) AS total \
             FROM transactions t JOIN products p ON t.StockCode = p.StockCode \
             WHERE {}{cutoff_clause} \
             GROUP BY month ORDER BY month",
            self.base_filter()
        );

        let rows = self.store.fetch_rows(&sql).await?;
        let mut observed = Vec::with_capacity(rows.len());
        for row in &rows {
            let values = decode_row(row)?;
            let Some(month) = values.first().and_then(Value::as_str).and_then(parse_month) else {
                continue;
            };
            observed.push(MonthlySales { month, total: number_at(&values, 1) });
        }

        Ok(fill_missing_months(observed))
    }

    pub async fn top_products(&self, limit: usize) -> Result<Vec<ProductSales>, QueryError> {
        let sql = format!(
            "SELECT p.Description AS description, TOTAL(t.Quantity * t.Price) AS revenue \
             FROM transactions t JOIN products p ON t.StockCode = p.StockCode \
             WHERE {} \
             GROUP BY p.Description ORDER BY revenue DESC LIMIT {}",
            self.base_filter(),
            limit.max(1)
        );

        let rows = self.store.fetch_rows(&sql).await?;
        let mut products = Vec::with_capacity(rows.len());
        for row in &rows {
            let values = decode_row(row)?;
            let description =
                values.first().and_then(Value::as_str).unwrap_or_default().to_string();
            products.push(ProductSales { description, revenue: number_at(&values, 1) });
        }
        Ok(products)
    }

    /// Total spend per identified customer, ordered by customer id. Only
    /// customers whose total is below `max_total` are kept; a non-finite
    /// ceiling keeps everyone.
    pub async fn customer_spending(
        &self,
        max_total: f64,
    ) -> Result<Vec<CustomerSpending>, QueryError> {
        let ceiling_clause = if max_total.is_finite() {
            format!(" HAVING spent < {max_total}")
        } else {
            String::new()
        };
        let sql = format!(
            "SELECT t.CustomerID AS customer_id, TOTAL(t.Quantity * t.Price) AS spent \
             FROM transactions t JOIN products p ON t.StockCode = p.StockCode \
             WHERE {} AND t.CustomerID IS NOT NULL \
             GROUP BY t.CustomerID{ceiling_clause} ORDER BY t.CustomerID",
            self.base_filter()
        );

        let rows = self.store.fetch_rows(&sql).await?;
        let mut customers = Vec::with_capacity(rows.len());
        for row in &rows {
            let values = decode_row(row)?;
            let Some(customer_id) = values.first().and_then(Value::as_i64) else {
                continue;
            };
            customers.push(CustomerSpending { customer_id, total: number_at(&values, 1) });
        }

        debug!(
            event_name = "analytics.customer_spending",
            customers = customers.len(),
            "computed customer spending"
        );
        Ok(customers)
    }
}

fn number_at(values: &[Value], index: usize) -> f64 {
    values.get(index).and_then(Value::as_f64).unwrap_or(0.0)
}

fn parse_month(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").ok()
}

fn fill_missing_months(observed: Vec<MonthlySales>) -> Vec<MonthlySales> {
    let (Some(first), Some(last)) = (observed.first(), observed.last()) else {
        return observed;
    };
    let (first, last) = (first.month, last.month);

    let mut filled = Vec::new();
    let mut cursor = Some(first);
    while let Some(month) = cursor.filter(|month| *month <= last) {
        let total = observed
            .iter()
            .find(|row| row.month.year() == month.year() && row.month.month() == month.month())
            .map(|row| row.total)
            .unwrap_or(0.0);
        filled.push(MonthlySales { month, total });
        cursor = next_month(month);
    }
    filled
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use shelfsense_core::config::DatabaseConfig;
    use shelfsense_core::schema::SchemaContract;
    use tempfile::TempDir;

    use super::{fill_missing_months, SalesAnalytics, SPENDING_CEILING};
    use crate::fixtures::{demo_expected_revenue, seed_demo_store};
    use crate::store::ReadOnlyStore;
    use shelfsense_core::forecast::MonthlySales;

    async fn analytics(dir: &TempDir) -> SalesAnalytics {
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("inventory.db").display()),
            max_connections: 1,
            timeout_secs: 5,
        };
        seed_demo_store(&config.url).await.expect("seed");
        let store = ReadOnlyStore::open(&config, 50).await.expect("store");
        SalesAnalytics::new(Arc::new(store), SchemaContract::inventory())
    }

    fn month(year: i32, month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, 1).expect("month")
    }

    #[tokio::test]
    async fn kpis_exclude_non_product_lines_and_returns() {
        let dir = TempDir::new().expect("temp dir");
        let analytics = analytics(&dir).await;

        let kpis = analytics.kpis().await.expect("kpis");
        assert!((kpis.total_revenue - demo_expected_revenue()).abs() < 1e-6, "{kpis:?}");
        assert!(kpis.total_orders > 0);
        let aov = kpis.average_order_value.expect("aov");
        assert!((aov - kpis.total_revenue / kpis.total_orders as f64).abs() < 1e-9);
    }

    #[tokio::test]
    async fn monthly_history_respects_cutoff() {
        let dir = TempDir::new().expect("temp dir");
        let analytics = analytics(&dir).await;

        let all = analytics.monthly_sales(None).await.expect("history");
        let trimmed = analytics.monthly_sales(Some(month(2011, 12))).await.expect("history");

        assert!(all.windows(2).all(|pair| pair[0].month < pair[1].month));
        assert_eq!(all.last().map(|row| row.month), Some(month(2011, 12)));
        assert_eq!(trimmed.last().map(|row| row.month), Some(month(2011, 11)));
        let summed: f64 = all.iter().map(|row| row.total).sum();
        assert!((summed - demo_expected_revenue()).abs() < 1e-6);
    }

    #[tokio::test]
    async fn best_sellers_never_list_excluded_descriptions() {
        let dir = TempDir::new().expect("temp dir");
        let analytics = analytics(&dir).await;
        let contract = SchemaContract::inventory();

        let top = analytics.top_products(10).await.expect("top products");
        assert!(!top.is_empty());
        assert!(top.iter().all(|product| !contract.is_excluded(&product.description)));
        assert!(top.windows(2).all(|pair| pair[0].revenue >= pair[1].revenue));
    }

    #[tokio::test]
    async fn customer_spending_groups_identified_customers_below_the_ceiling() {
        let dir = TempDir::new().expect("temp dir");
        let analytics = analytics(&dir).await;

        let everyone = analytics.customer_spending(SPENDING_CEILING).await.expect("spending");
        let ids = everyone.iter().map(|row| row.customer_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![12583, 13047, 14688, 17850]);
        let summed: f64 = everyone.iter().map(|row| row.total).sum();
        assert!((summed - demo_expected_revenue()).abs() < 1e-6);
        let regular = everyone.iter().find(|row| row.customer_id == 13047).expect("13047");
        assert!((regular.total - 91.68).abs() < 1e-6, "{regular:?}");

        let capped = analytics.customer_spending(150.0).await.expect("spending");
        assert_eq!(capped.iter().map(|row| row.customer_id).collect::<Vec<_>>(), vec![13047, 14688, 17850]);
        assert!(capped.iter().all(|row| row.total < 150.0));
    }

    #[test]
    fn gaps_between_months_are_zero_filled() {
        let filled = fill_missing_months(vec![
            MonthlySales { month: month(2010, 11), total: 5.0 },
            MonthlySales { month: month(2011, 2), total: 7.0 },
        ]);

        let months = filled.iter().map(|row| row.month).collect::<Vec<_>>();
        assert_eq!(months, vec![month(2010, 11), month(2010, 12), month(2011, 1), month(2011, 2)]);
        assert_eq!(filled[1].total, 0.0);
        assert_eq!(filled[3].total, 7.0);
    }
}
