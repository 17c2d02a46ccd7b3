use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::model::AgentMessage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" | "assistant" | "system", any casing
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model_name: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub allow_search: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub request_id: Uuid,
    pub model: String,
    #[serde(default)]
    pub response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            _ => Err(ApiError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        f.write_str(name)
    }
}

impl Role {
    pub fn into_agent_message(self, content: impl Into<String>) -> AgentMessage {
        match self {
            Role::User => AgentMessage::human(content),
            Role::Assistant => AgentMessage::ai(content),
            Role::System => AgentMessage::system(content),
        }
    }
}

/// Translate API messages into the agent's schema, preserving order.
/// Fails on the first unrecognised role.
pub fn to_agent_messages(messages: &[ChatMessage]) -> Result<Vec<AgentMessage>, ApiError> {
    messages
        .iter()
        .map(|msg| {
            let role: Role = msg.role.parse()?;
            Ok(role.into_agent_message(msg.content.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            role: role.into(),
            content: content.into(),
        }
    }

    #[test]
    fn roles_parse_in_any_case() {
        for (raw, role) in [
            ("user", Role::User),
            ("USER", Role::User),
            ("Assistant", Role::Assistant),
            ("sYsTeM", Role::System),
        ] {
            assert_eq!(raw.parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn display_is_the_wire_name() {
        assert_eq!(ChatMessage::new(Role::Assistant, "x").role, "assistant");
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn unknown_role_names_the_offender() {
        let err = "Tool".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid role: Tool");
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn conversion_keeps_order_and_kinds() {
        let converted = to_agent_messages(&[
            msg("system", "be kind"),
            msg("User", "hi"),
            msg("assistant", "hello"),
        ])
        .unwrap();

        assert_eq!(
            converted,
            vec![
                AgentMessage::system("be kind"),
                AgentMessage::human("hi"),
                AgentMessage::ai("hello"),
            ]
        );
    }

    #[test]
    fn conversion_rejects_whole_list_on_bad_role() {
        let err = to_agent_messages(&[msg("user", "hi"), msg("bot", "??")]).unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref m) if m == "Invalid role: bot"));
    }

    #[test]
    fn request_defaults_optional_fields() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"model_name":"llama-3.1-8b-instant","messages":[{"role":"user","content":"hi"}]}"#,
        )
        .unwrap();
        assert!(req.system_prompt.is_none());
        assert!(!req.allow_search);
        assert_eq!(req.messages.len(), 1);
    }
}
