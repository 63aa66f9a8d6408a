use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const GREETING: &str =
    "Hello! I can analyze your database. Ask me anything like: 'What are the top 5 products?'";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Session transcript. Append-only; owned by the caller and threaded through
/// each `respond` call. The session id tags every audit event of the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default = "new_session_id")]
    session_id: String,
    messages: Vec<ChatTurn>,
}

fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// A fresh transcript opening with the assistant greeting.
    pub fn new() -> Self {
        Self {
            session_id: new_session_id(),
            messages: vec![ChatTurn { role: ChatRole::Assistant, content: GREETING.to_string() }],
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn push(&mut self, role: ChatRole, content: impl Into<String>) {
        self.messages.push(ChatTurn { role, content: content.into() });
    }

    pub fn messages(&self) -> &[ChatTurn] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|turn| turn.role == ChatRole::Assistant)
            .map(|turn| turn.content.as_str())
    }
}
