use std::sync::Arc;

use shelfsense_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use shelfsense_core::config::AppConfig;
use shelfsense_core::errors::AssistantError;
use shelfsense_core::schema::SchemaContract;
use shelfsense_db::ReadOnlyStore;
use tracing::{error, info};
use uuid::Uuid;

use crate::conversation::{ChatRole, Conversation};
use crate::guardrails::Guardrail;
use crate::llm::connect_llm;
use crate::planner::{AgentResponse, Planner, PlannerSettings, QueryPlanner};
use crate::tools::sql_toolkit;

const ACTOR: &str = "assistant";

/// Chat boundary: guardrail first, then the planner, with every failure turned
/// into a reply the user can read.
pub struct Assistant<P = QueryPlanner> {
    planner: Option<P>,
    guardrail: Guardrail,
    audit: Arc<dyn AuditSink>,
}

impl Assistant<QueryPlanner> {
    /// Wires the production planner. A missing or rejected credential leaves the
    /// assistant without a planner rather than failing startup.
    pub async fn from_config(
        config: &AppConfig,
        store: Arc<ReadOnlyStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let planner = match connect_llm(&config.llm).await {
            Ok(llm) => {
                let contract = SchemaContract::inventory();
                let tools = sql_toolkit(store, contract.clone(), config.agent.enforce_exclusions);
                let settings = PlannerSettings::from_config(&config.agent, &config.llm);
                Some(QueryPlanner::new(llm, tools, &contract, settings))
            }
            Err(error) => {
                error!(
                    event_name = "planner.unavailable",
                    error = %error,
                    authentication = error.is_authentication(),
                    "query planner could not be constructed"
                );
                None
            }
        };
        Self::new(planner, audit)
    }
}

impl<P> Assistant<P>
where
    P: Planner,
{
    pub fn new(planner: Option<P>, audit: Arc<dyn AuditSink>) -> Self {
        Self { planner, guardrail: Guardrail::new(), audit }
    }

    pub fn has_planner(&self) -> bool {
        self.planner.is_some()
    }

    pub async fn respond(
        &self,
        mut conversation: Conversation,
        question: &str,
    ) -> (Conversation, String) {
        let correlation_id = Uuid::new_v4().to_string();
        let session_id = conversation.session_id().to_string();
        conversation.push(ChatRole::User, question);

        let reply = match self.answer_in_session(question, &correlation_id, Some(&session_id)).await
        {
            Ok(response) => response.output,
            Err(error) => error.user_message().to_string(),
        };

        conversation.push(ChatRole::Assistant, reply.clone());
        (conversation, reply)
    }

    /// One-shot question outside any conversation.
    pub async fn answer(
        &self,
        question: &str,
        correlation_id: &str,
    ) -> Result<AgentResponse, AssistantError> {
        self.answer_in_session(question, correlation_id, None).await
    }

    pub async fn answer_in_session(
        &self,
        question: &str,
        correlation_id: &str,
        session_id: Option<&str>,
    ) -> Result<AgentResponse, AssistantError> {
        let context = AuditContext::new(session_id.map(str::to_owned), correlation_id, ACTOR);

        let verdict = self.guardrail.inspect(question);
        let verdict_outcome =
            if verdict.passed { AuditOutcome::Success } else { AuditOutcome::Rejected };
        let mut verdict_event =
            AuditEvent::new(&context, "guardrail.verdict", AuditCategory::Guardrail, verdict_outcome);
        if let Some(keyword) = verdict.matched_keyword {
            verdict_event = verdict_event.with_metadata("keyword", keyword);
        }
        self.audit.emit(verdict_event);

        if let Some(keyword) = verdict.matched_keyword {
            return Err(AssistantError::GuardrailRejection { keyword: keyword.to_string() });
        }

        let Some(planner) = &self.planner else {
            let error = AssistantError::AuthenticationFailure("query planner not configured".to_string());
            self.emit_failure(&context, &error);
            return Err(error);
        };

        match planner.invoke(question).await {
            Ok(response) => {
                info!(
                    event_name = "assistant.answered",
                    correlation_id,
                    session_id = session_id.unwrap_or("none"),
                    steps = response.steps.len(),
                    queries = response.executed_sql.len(),
                    "question answered"
                );
                self.audit.emit(
                    AuditEvent::new(
                        &context,
                        "planner.completed",
                        AuditCategory::Planner,
                        AuditOutcome::Success,
                    )
                    .with_metadata("steps", response.steps.len().to_string())
                    .with_metadata("queries", response.executed_sql.len().to_string()),
                );
                Ok(response)
            }
            Err(planner_error) => {
                let error = AssistantError::from(planner_error);
                self.emit_failure(&context, &error);
                Err(error)
            }
        }
    }

    fn emit_failure(&self, context: &AuditContext, error: &AssistantError) {
        error!(
            event_name = "assistant.failed",
            correlation_id = %context.correlation_id,
            error_class = error.error_class(),
            error = %error,
            "question could not be answered"
        );
        self.audit.emit(
            AuditEvent::new(context, "planner.failed", AuditCategory::Planner, AuditOutcome::Failed)
                .with_metadata("error_class", error.error_class()),
        );
    }
}
