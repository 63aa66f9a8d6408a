//! Conversational analysis runtime.
//!
//! A question moves through a fixed pipeline:
//! 1. **Guardrail** (`guardrails`) - reject destructive intent before any model call
//! 2. **Planner** (`planner`) - reason-act loop over a language model (`llm`)
//! 3. **Tools** (`tools`) - list, describe and query the read-only store
//! 4. **Reply** (`runtime`) - fold the answer or a user-safe notice into the transcript
//!
//! # Safety Principle
//!
//! The model proposes SQL; it never holds a writable handle. Every statement it
//! emits is gated lexically and then executed on a `query_only` connection.

pub mod conversation;
pub mod guardrails;
pub mod llm;
pub mod planner;
pub mod prompt;
pub mod runtime;
pub mod tools;

pub use conversation::{ChatRole, ChatTurn, Conversation, GREETING};
pub use guardrails::{Guardrail, GuardrailVerdict, FORBIDDEN_KEYWORDS};
pub use llm::{connect_llm, LlmClient, LlmError};
pub use planner::{AgentResponse, AgentStep, Planner, PlannerError, PlannerSettings, QueryPlanner};
pub use runtime::Assistant;
pub use tools::{sql_toolkit, Tool, ToolError, ToolRegistry};
