use thiserror::Error;

pub const SECURITY_NOTICE: &str = "**Security Alert:** This query contains restricted keywords (e.g., DROP, DELETE) and cannot be executed.";
pub const PLANNER_UNAVAILABLE_NOTICE: &str = "Agent initialization failed. Check API key.";

/// Failure classes of one assistant interaction.
///
/// Every variant has a user-safe rendering in [`AssistantError::user_message`];
/// the `Display` text is for logs only.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AssistantError {
    #[error("question rejected by guardrail: matched `{keyword}`")]
    GuardrailRejection { keyword: String },
    #[error("planner could not be constructed: {0}")]
    AuthenticationFailure(String),
    #[error("read-only enforcement rejected a statement: {0}")]
    EnforcementViolation(String),
    #[error("planner output could not be parsed: {0}")]
    ParseFailure(String),
    #[error("step budget of {max_steps} exhausted without a final answer")]
    BudgetExhausted { max_steps: u32 },
    #[error("turn exceeded the {timeout_secs}s wall-clock limit")]
    TurnTimeout { timeout_secs: u64 },
    #[error("language model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("data store failure: {0}")]
    Store(String),
}

impl AssistantError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::GuardrailRejection { .. } => "guardrail_rejection",
            Self::AuthenticationFailure(_) => "authentication_failure",
            Self::EnforcementViolation(_) => "enforcement_violation",
            Self::ParseFailure(_) => "parse_failure",
            Self::BudgetExhausted { .. } => "budget_exhausted",
            Self::TurnTimeout { .. } => "turn_timeout",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::Store(_) => "store_failure",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::GuardrailRejection { .. } => SECURITY_NOTICE,
            Self::AuthenticationFailure(_) => PLANNER_UNAVAILABLE_NOTICE,
            Self::EnforcementViolation(_) => {
                "That request would modify the database, which is read-only. Ask a question about the data instead."
            }
            Self::ParseFailure(_) => {
                "I could not interpret the analysis steps for that question. Please rephrase it."
            }
            Self::BudgetExhausted { .. } => {
                "I could not complete this analysis within the allowed number of steps. Try a more specific question."
            }
            Self::TurnTimeout { .. } => "The analysis took too long. Please try again.",
            Self::ModelUnavailable(_) => {
                "The language model is currently unavailable. Please try again shortly."
            }
            Self::Store(_) => "The inventory database could not be queried. Please try again shortly.",
        }
    }

    /// Whether asking the same question again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TurnTimeout { .. } | Self::ModelUnavailable(_) | Self::Store(_))
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Assistant(#[from] AssistantError),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = "unassigned".to_owned();
        match value {
            ApplicationError::Assistant(error) if error.is_retryable() => {
                Self::ServiceUnavailable { message: error.to_string(), correlation_id: unassigned }
            }
            ApplicationError::Assistant(AssistantError::AuthenticationFailure(message)) => {
                Self::Internal { message, correlation_id: unassigned }
            }
            ApplicationError::Assistant(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id: unassigned }
            }
            ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned }
            }
        }
    }
}
