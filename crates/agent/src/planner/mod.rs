//! Reason-act query planner.
//!
//! The planner drives a language model through the Thought/Action/Observation
//! protocol. Every move goes through [`engine::transition`], so the loop is an
//! explicit state machine with a step counter; the driver here only performs the
//! side effects (model calls, tool calls) the current state asks for.

pub mod engine;
pub mod parser;
pub mod states;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use shelfsense_core::config::{AgentConfig, LlmConfig};
use shelfsense_core::errors::AssistantError;
use shelfsense_core::schema::SchemaContract;
use thiserror::Error;
use shelfsense_db::QueryError;
use tracing::{debug, error, info, warn};

use crate::llm::{ChatMessage, CompletionRequest, LlmClient};
use crate::prompt::{self, DEFAULT_TOP_K, OBSERVATION_PREFIX, THOUGHT_PREFIX};
use crate::tools::{ToolError, ToolRegistry, QUERY_TOOL};

pub use engine::{transition, PlannerTransitionError};
pub use parser::{parse_reply, ReplyParseError};
pub use states::{
    ParsedReply, PlannerEvent, PlannerFailure, PlannerState, ToolCall, TransitionOutcome,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentStep {
    pub tool: String,
    pub input: String,
    pub observation: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AgentResponse {
    pub output: String,
    pub steps: Vec<AgentStep>,
    pub executed_sql: Vec<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlannerError {
    #[error("step budget of {max_steps} exhausted without a final answer")]
    BudgetExhausted { max_steps: u32 },
    #[error("turn exceeded {timeout_secs}s")]
    TurnTimeout { timeout_secs: u64 },
    #[error("language model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("read-only enforcement failed: {0}")]
    EnforcementViolation(String),
    #[error("data store unavailable: {0}")]
    StoreUnavailable(String),
    #[error(transparent)]
    Transition(#[from] PlannerTransitionError),
}

impl From<PlannerError> for AssistantError {
    fn from(error: PlannerError) -> Self {
        match error {
            PlannerError::BudgetExhausted { max_steps } => Self::BudgetExhausted { max_steps },
            PlannerError::TurnTimeout { timeout_secs } => Self::TurnTimeout { timeout_secs },
            PlannerError::ModelUnavailable(message) => Self::ModelUnavailable(message),
            PlannerError::EnforcementViolation(message) => Self::EnforcementViolation(message),
            PlannerError::StoreUnavailable(message) => Self::Store(message),
            PlannerError::Transition(error) => Self::ParseFailure(error.to_string()),
        }
    }
}

#[async_trait]
pub trait Planner: Send + Sync {
    async fn invoke(&self, question: &str) -> Result<AgentResponse, PlannerError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlannerSettings {
    pub max_steps: u32,
    pub turn_timeout: Duration,
    pub temperature: f32,
    pub top_k: usize,
}

impl PlannerSettings {
    pub fn from_config(agent: &AgentConfig, llm: &LlmConfig) -> Self {
        Self {
            max_steps: agent.max_steps,
            turn_timeout: Duration::from_secs(agent.turn_timeout_secs),
            temperature: llm.temperature,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            max_steps: 15,
            turn_timeout: Duration::from_secs(120),
            temperature: 0.0,
            top_k: DEFAULT_TOP_K,
        }
    }
}

pub struct QueryPlanner {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    system_prompt: String,
    settings: PlannerSettings,
}

impl QueryPlanner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        contract: &SchemaContract,
        settings: PlannerSettings,
    ) -> Self {
        let system_prompt = prompt::planner_prompt(contract, &tools.descriptions(), settings.top_k);
        Self { llm, tools, system_prompt, settings }
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    fn unknown_tool_feedback(&self, requested: &str) -> String {
        format!("{requested} is not a valid tool, try one of [{}].", self.tools.names().join(", "))
    }

    async fn run(&self, question: &str) -> Result<AgentResponse, PlannerError> {
        let budget = self.settings.max_steps;
        let mut state = PlannerState::Reasoning;
        let mut steps = 0_u32;
        let mut scratchpad = String::new();
        let mut trace = Vec::new();
        let mut executed_sql = Vec::new();

        loop {
            let event = match &state {
                PlannerState::Done(answer) => {
                    info!(
                        event_name = "planner.completed",
                        steps,
                        queries = executed_sql.len(),
                        "planner produced a final answer"
                    );
                    return Ok(AgentResponse { output: answer.clone(), steps: trace, executed_sql });
                }
                PlannerState::Failed(PlannerFailure::BudgetExhausted { .. }) => {
                    warn!(event_name = "planner.budget_exhausted", steps, "planner ran out of steps");
                    return Err(PlannerError::BudgetExhausted { max_steps: budget });
                }
                PlannerState::Failed(PlannerFailure::ModelUnavailable(message)) => {
                    return Err(PlannerError::ModelUnavailable(message.clone()));
                }
                PlannerState::Failed(PlannerFailure::ReadOnlyBreached(message)) => {
                    error!(event_name = "planner.read_only_breached", error = %message, "store lost read-only mode");
                    return Err(PlannerError::EnforcementViolation(message.clone()));
                }
                PlannerState::Failed(PlannerFailure::StoreUnavailable(message)) => {
                    return Err(PlannerError::StoreUnavailable(message.clone()));
                }
                _ if state.awaits_model() && steps >= budget => {
                    return Err(PlannerError::BudgetExhausted { max_steps: budget });
                }
                PlannerState::Reasoning | PlannerState::ObservingResult(_) => {
                    self.next_model_event(question, &scratchpad).await
                }
                PlannerState::ActingOnTool(call) => {
                    let (event, observation) = self.run_tool(call).await;
                    if call.tool == QUERY_TOOL && matches!(event, PlannerEvent::ToolCompleted { .. }) {
                        executed_sql.push(call.input.clone());
                    }
                    trace.push(AgentStep {
                        tool: call.tool.clone(),
                        input: call.input.clone(),
                        observation: observation.clone(),
                    });
                    scratchpad.push_str(&scratch_entry(&call.log, &observation));
                    event
                }
            };

            if let PlannerEvent::ReplyUnparsable { log, feedback } = &event {
                scratchpad.push_str(&scratch_entry(log, feedback));
            }

            let outcome = transition(&state, &event, steps, budget)?;
            debug!(
                event_name = "planner.transition",
                from = ?outcome.from,
                to = ?outcome.to,
                steps = outcome.steps,
                "planner step"
            );
            state = outcome.to;
            steps = outcome.steps;
        }
    }

    async fn next_model_event(&self, question: &str, scratchpad: &str) -> PlannerEvent {
        let request = CompletionRequest {
            messages: vec![
                ChatMessage::system(self.system_prompt.clone()),
                ChatMessage::user(prompt::question_turn(question, scratchpad)),
            ],
            stop: vec![format!("\n{OBSERVATION_PREFIX}"), format!("\n\t{OBSERVATION_PREFIX}")],
            temperature: self.settings.temperature,
        };

        let reply = match self.llm.complete(&request).await {
            Ok(reply) => reply,
            Err(error) => return PlannerEvent::ModelFailed { message: error.to_string() },
        };

        match parse_reply(&reply) {
            Ok(ParsedReply::Action(call)) if self.tools.get(&call.tool).is_none() => {
                let feedback = self.unknown_tool_feedback(&call.tool);
                PlannerEvent::ReplyUnparsable { log: call.log, feedback }
            }
            Ok(parsed) => PlannerEvent::ModelReplied(parsed),
            Err(error) => {
                debug!(event_name = "planner.reply_unparsable", error = %error, "model reply not in protocol");
                PlannerEvent::ReplyUnparsable { log: reply.trim_end().to_string(), feedback: error.to_string() }
            }
        }
    }

    async fn run_tool(&self, call: &ToolCall) -> (PlannerEvent, String) {
        let Some(tool) = self.tools.get(&call.tool) else {
            let observation = self.unknown_tool_feedback(&call.tool);
            return (PlannerEvent::ToolFailed { observation: observation.clone() }, observation);
        };

        match tool.execute(&call.input).await {
            Ok(observation) => {
                (PlannerEvent::ToolCompleted { observation: observation.clone() }, observation)
            }
            Err(error) => {
                debug!(event_name = "planner.tool_failed", tool = %call.tool, error = %error, "tool returned an error");
                let observation = format!("Error: {error}");
                match abort_reason(&error) {
                    Some(failure) => (PlannerEvent::ToolAborted { failure }, observation),
                    None => {
                        (PlannerEvent::ToolFailed { observation: observation.clone() }, observation)
                    }
                }
            }
        }
    }
}

/// Tool errors after which no further query can succeed in this turn.
fn abort_reason(error: &ToolError) -> Option<PlannerFailure> {
    match error {
        ToolError::Query(QueryError::ReadOnlyLost(message)) => {
            Some(PlannerFailure::ReadOnlyBreached(message.clone()))
        }
        ToolError::Query(query) if query.is_store_closed() => {
            Some(PlannerFailure::StoreUnavailable(query.to_string()))
        }
        _ => None,
    }
}

fn scratch_entry(log: &str, observation: &str) -> String {
    format!("{log}\n{OBSERVATION_PREFIX} {observation}\n{THOUGHT_PREFIX} ")
}

#[async_trait]
impl Planner for QueryPlanner {
    async fn invoke(&self, question: &str) -> Result<AgentResponse, PlannerError> {
        let timeout = self.settings.turn_timeout;
        match tokio::time::timeout(timeout, self.run(question)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    event_name = "planner.turn_timeout",
                    timeout_secs = timeout.as_secs(),
                    "planner turn exceeded its time limit"
                );
                Err(PlannerError::TurnTimeout { timeout_secs: timeout.as_secs() })
            }
        }
    }
}
