use shelfsense_core::config::LoadOptions;
use shelfsense_core::schema::SchemaContract;
use shelfsense_db::{SalesAnalytics, SalesKpis, SPENDING_CEILING};

use crate::commands::{CommandContext, CommandResult, EXIT_DATABASE};

const TOP_PRODUCTS: usize = 5;

pub fn run(options: LoadOptions) -> CommandResult {
    let context = match CommandContext::prepare("kpis", options) {
        Ok(context) => context,
        Err(failure) => return failure,
    };

    context.runtime.block_on(async {
        let store = match context.open_store("kpis").await {
            Ok(store) => store,
            Err(failure) => return failure,
        };
        let analytics = SalesAnalytics::new(store.clone(), SchemaContract::inventory());

        let result = async {
            let kpis = analytics.kpis().await?;
            let top = analytics.top_products(TOP_PRODUCTS).await?;
            let spending = analytics.customer_spending(SPENDING_CEILING).await?;
            Ok::<_, shelfsense_db::QueryError>((kpis, top, spending))
        }
        .await;
        store.close().await;

        match result {
            Ok((kpis, top, spending)) => CommandResult::success_with_data(
                "kpis",
                kpi_message(&kpis),
                Some(serde_json::json!({
                    "kpis": kpis,
                    "top_products": top,
                    "customer_spending": spending,
                })),
            ),
            Err(error) => CommandResult::failure(
                "kpis",
                "query_execution",
                format!("sales figures could not be computed: {error}"),
                EXIT_DATABASE,
            ),
        }
    })
}

fn kpi_message(kpis: &SalesKpis) -> String {
    let average = kpis
        .average_order_value
        .map(|value| format!("{value:.2}"))
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "total revenue {:.2} | orders {} | items sold {} | average order value {average}",
        kpis.total_revenue, kpis.total_orders, kpis.items_sold
    )
}
