//! Provider-side message schema and the chat model abstraction the agent
//! drives.

mod groq;

pub use groq::GroqModel;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// A message in the agent's conversation state
#[derive(Debug, Clone, PartialEq)]
pub enum AgentMessage {
    System {
        content: String,
    },
    Human {
        content: String,
    },
    Ai {
        content: String,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        content: String,
        tool_call_id: String,
        name: String,
    },
}

impl AgentMessage {
    pub fn system(content: impl Into<String>) -> Self {
        AgentMessage::System {
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        AgentMessage::Human {
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        AgentMessage::Ai {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            AgentMessage::System { content }
            | AgentMessage::Human { content }
            | AgentMessage::Ai { content, .. }
            | AgentMessage::Tool { content, .. } => content,
        }
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, AgentMessage::Ai { .. })
    }
}

/// Tool description advertised to the model
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object
    pub parameters: serde_json::Value,
}

/// A chat model able to answer with text or with tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the next assistant turn, always an `AgentMessage::Ai`.
    async fn invoke(&self, messages: &[AgentMessage], tools: &[ToolSpec]) -> Result<AgentMessage>;
}
