use thiserror::Error;

use crate::planner::states::{
    ParsedReply, PlannerEvent, PlannerFailure, PlannerState, TransitionOutcome,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PlannerTransitionError {
    #[error("invalid planner transition from {state:?} using event {event:?}")]
    InvalidTransition { state: PlannerState, event: PlannerEvent },
}

/// Pure transition function of the reason-act loop.
///
/// `steps` counts model replies so far, parse failures included; a step that
/// would leave the loop observing once `budget` replies have been spent ends in
/// `Failed(BudgetExhausted)` instead. A final answer is always accepted.
pub fn transition(
    current: &PlannerState,
    event: &PlannerEvent,
    steps: u32,
    budget: u32,
) -> Result<TransitionOutcome, PlannerTransitionError> {
    use PlannerEvent::{
        ModelFailed, ModelReplied, ReplyUnparsable, ToolAborted, ToolCompleted, ToolFailed,
    };
    use PlannerState::{ActingOnTool, Done, Failed, ObservingResult};

    let observe_or_stop = |observation: &str, steps: u32| {
        if steps >= budget {
            Failed(PlannerFailure::BudgetExhausted { steps })
        } else {
            ObservingResult(observation.to_string())
        }
    };

    let (to, steps) = match (current, event) {
        (state, ModelReplied(ParsedReply::Final(answer))) if state.awaits_model() => {
            (Done(answer.clone()), steps + 1)
        }
        (state, ModelReplied(ParsedReply::Action(call))) if state.awaits_model() => {
            (ActingOnTool(call.clone()), steps + 1)
        }
        (state, ReplyUnparsable { feedback, .. }) if state.awaits_model() => {
            (observe_or_stop(feedback, steps + 1), steps + 1)
        }
        (ActingOnTool(_), ToolCompleted { observation } | ToolFailed { observation }) => {
            (observe_or_stop(observation, steps), steps)
        }
        (ActingOnTool(_), ToolAborted { failure }) => (Failed(failure.clone()), steps),
        (state, ModelFailed { message }) if !state.is_terminal() => {
            (Failed(PlannerFailure::ModelUnavailable(message.clone())), steps)
        }
        _ => {
            return Err(PlannerTransitionError::InvalidTransition {
                state: current.clone(),
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: current.clone(), to, steps })
}
