use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    pub input: String,
    /// Raw model text that produced the call; replayed in the scratchpad.
    pub log: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsedReply {
    Action(ToolCall),
    Final(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannerFailure {
    BudgetExhausted { steps: u32 },
    ModelUnavailable(String),
    /// The store reported that a connection lost its read-only mode.
    ReadOnlyBreached(String),
    StoreUnavailable(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannerState {
    Reasoning,
    ActingOnTool(ToolCall),
    ObservingResult(String),
    Done(String),
    Failed(PlannerFailure),
}

impl PlannerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }

    /// States in which the next move is a model call.
    pub fn awaits_model(&self) -> bool {
        matches!(self, Self::Reasoning | Self::ObservingResult(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannerEvent {
    ModelReplied(ParsedReply),
    ReplyUnparsable { log: String, feedback: String },
    ToolCompleted { observation: String },
    ToolFailed { observation: String },
    /// A tool failure that ends the turn instead of becoming an observation.
    ToolAborted { failure: PlannerFailure },
    ModelFailed { message: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: PlannerState,
    pub to: PlannerState,
    pub steps: u32,
}
