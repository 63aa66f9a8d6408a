use std::sync::OnceLock;

use regex::RegexSet;
use serde::Serialize;
use tracing::{error, warn};

/// Keywords that end an interaction before any planning happens: write/DDL
/// verbs plus the two most common prompt-injection openers.
pub const FORBIDDEN_KEYWORDS: [&str; 10] = [
    "DROP",
    "DELETE",
    "UPDATE",
    "INSERT",
    "ALTER",
    "TRUNCATE",
    "GRANT",
    "REVOKE",
    "IGNORE",
    "INSTRUCTION",
];

/// Reported as the matched keyword when the keyword set could not be built.
pub const UNAVAILABLE_KEYWORD: &str = "<guardrail unavailable>";

fn compile_keywords(keywords: &[&str]) -> Result<RegexSet, regex::Error> {
    RegexSet::new(keywords.iter().map(|keyword| format!(r"\b{}\b", regex::escape(keyword))))
}

fn keyword_set() -> Option<&'static RegexSet> {
    static SET: OnceLock<Option<RegexSet>> = OnceLock::new();
    SET.get_or_init(|| match compile_keywords(&FORBIDDEN_KEYWORDS) {
        Ok(set) => Some(set),
        Err(compile_error) => {
            error!(
                event_name = "guardrail.init_failed",
                error = %compile_error,
                "keyword patterns failed to compile; every question will be rejected"
            );
            None
        }
    })
    .as_ref()
}

/// First forbidden keyword in list order, or [`UNAVAILABLE_KEYWORD`] when
/// there is no keyword set to screen with.
fn first_match(set: Option<&RegexSet>, normalized: &str) -> Option<&'static str> {
    let Some(set) = set else {
        return Some(UNAVAILABLE_KEYWORD);
    };
    set.matches(normalized).iter().next().and_then(|index| FORBIDDEN_KEYWORDS.get(index).copied())
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GuardrailVerdict {
    pub passed: bool,
    pub matched_keyword: Option<&'static str>,
}

impl GuardrailVerdict {
    fn pass() -> Self {
        Self { passed: true, matched_keyword: None }
    }

    fn reject(keyword: &'static str) -> Self {
        Self { passed: false, matched_keyword: Some(keyword) }
    }
}

/// Whole-word, case-insensitive screen for forbidden keywords.
///
/// Stateless: the same text always produces the same verdict.
#[derive(Clone, Copy, Debug, Default)]
pub struct Guardrail;

impl Guardrail {
    pub fn new() -> Self {
        Self
    }

    pub fn inspect(&self, question: &str) -> GuardrailVerdict {
        let normalized = question.to_uppercase();
        match first_match(keyword_set(), &normalized) {
            Some(keyword) => {
                warn!(
                    event_name = "guardrail.rejected",
                    keyword,
                    "question contains a forbidden keyword"
                );
                GuardrailVerdict::reject(keyword)
            }
            None => GuardrailVerdict::pass(),
        }
    }

    pub fn check(&self, question: &str) -> bool {
        self.inspect(question).passed
    }
}
