//! Parser for the Thought/Action/Action Input/Final Answer reply format.

use thiserror::Error;

use crate::planner::states::{ParsedReply, ToolCall};
use crate::prompt::{ACTION_INPUT_PREFIX, ACTION_PREFIX, FINAL_ANSWER_PREFIX, OBSERVATION_PREFIX};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReplyParseError {
    #[error("Invalid Format: Missing 'Action:' after 'Thought:'")]
    MissingAction,
    #[error("Invalid Format: Missing 'Action Input:' after 'Action:'")]
    MissingActionInput,
    #[error("Parsing LLM output produced both a final answer and a parse-able action")]
    ActionAndFinalAnswer,
}

pub fn parse_reply(text: &str) -> Result<ParsedReply, ReplyParseError> {
    let includes_answer = text.contains(FINAL_ANSWER_PREFIX);
    let action_at = text.find(ACTION_PREFIX);
    let input_at = action_at
        .and_then(|start| text[start..].find(ACTION_INPUT_PREFIX).map(|offset| start + offset));

    match (action_at, input_at) {
        (Some(action_start), Some(input_start)) => {
            if includes_answer {
                return Err(ReplyParseError::ActionAndFinalAnswer);
            }
            let tool = text[action_start + ACTION_PREFIX.len()..input_start].trim();
            let raw_input = &text[input_start + ACTION_INPUT_PREFIX.len()..];
            Ok(ParsedReply::Action(ToolCall {
                tool: tool.trim_matches('`').trim().to_string(),
                input: clean_action_input(raw_input).to_string(),
                log: text.trim_end().to_string(),
            }))
        }
        _ if includes_answer => {
            let answer = text.rsplit(FINAL_ANSWER_PREFIX).next().unwrap_or_default().trim();
            Ok(ParsedReply::Final(answer.to_string()))
        }
        (None, _) => Err(ReplyParseError::MissingAction),
        (Some(_), None) => Err(ReplyParseError::MissingActionInput),
    }
}

fn clean_action_input(raw: &str) -> &str {
    let without_observation = raw
        .split_once(&format!("\n{OBSERVATION_PREFIX}"))
        .map(|(head, _)| head)
        .unwrap_or(raw);
    let mut input = without_observation.trim();
    if let Some(fenced) = input.strip_prefix("```sql").or_else(|| input.strip_prefix("```")) {
        input = fenced.trim_end_matches("```").trim();
    }
    input.trim_matches(|ch| ch == '"' || ch == '`').trim()
}
