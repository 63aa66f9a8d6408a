pub mod audit;
pub mod config;
pub mod errors;
pub mod forecast;
pub mod schema;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use errors::{
    ApplicationError, AssistantError, InterfaceError, PLANNER_UNAVAILABLE_NOTICE, SECURITY_NOTICE,
};
pub use forecast::{Forecast, ForecastOutcome, ForecastService, MonthlySales};
pub use schema::{SchemaContract, EXCLUDED_DESCRIPTIONS};
