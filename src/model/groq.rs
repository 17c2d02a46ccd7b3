use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde_json::{json, Value};

use super::{AgentMessage, ChatModel, ToolCall, ToolSpec};
use crate::config::Settings;

// A wrapper for Groq's OpenAI-compatible chat completions API
pub struct GroqModel {
    model: String,
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
    client: Client,
}

impl GroqModel {
    pub fn new(client: Client, settings: &Settings, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: settings.groq_base_url.trim_end_matches('/').to_string(),
            api_key: settings.groq_api_key.clone(),
            temperature: settings.temperature,
            client,
        }
    }

    fn payload(&self, messages: &[AgentMessage], tools: &[ToolSpec]) -> Value {
        let mut payload = json!({
            "model": self.model,
            "messages": messages.iter().map(to_wire).collect::<Vec<_>>(),
            "temperature": self.temperature,
        });

        if !tools.is_empty() {
            payload["tools"] = tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
        }

        payload
    }
}

#[async_trait]
impl ChatModel for GroqModel {
    async fn invoke(&self, messages: &[AgentMessage], tools: &[ToolSpec]) -> Result<AgentMessage> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = self.payload(messages, tools);

        info!(
            "Sending {} messages to {} ({} tools)",
            messages.len(),
            self.model,
            tools.len()
        );
        debug!("Payload: {}", payload);

        let mut request = self.client.post(&url).json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("Groq request failed ({}): {}", status, error_text));
        }

        let response_json: Value = response.json().await?;
        debug!("Response JSON: {}", response_json);

        parse_reply(&response_json)
    }
}

/// Map an agent message onto the OpenAI chat message schema.
pub(crate) fn to_wire(message: &AgentMessage) -> Value {
    match message {
        AgentMessage::System { content } => json!({ "role": "system", "content": content }),
        AgentMessage::Human { content } => json!({ "role": "user", "content": content }),
        AgentMessage::Ai {
            content,
            tool_calls,
        } => {
            let mut wire = json!({ "role": "assistant", "content": content });
            if !tool_calls.is_empty() {
                wire["tool_calls"] = tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
            }
            wire
        }
        AgentMessage::Tool {
            content,
            tool_call_id,
            ..
        } => json!({ "role": "tool", "content": content, "tool_call_id": tool_call_id }),
    }
}

/// Extract the assistant turn from a chat completions response.
pub(crate) fn parse_reply(response_json: &Value) -> Result<AgentMessage> {
    let message = response_json
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("Failed to extract message from response"))?;

    let content = message
        .get("content")
        .and_then(|content| content.as_str())
        .unwrap_or_default()
        .to_string();

    let raw_calls = message
        .get("tool_calls")
        .and_then(|calls| calls.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut tool_calls = Vec::with_capacity(raw_calls.len());
    for raw in raw_calls {
        match parse_tool_call(raw) {
            Some(call) => tool_calls.push(call),
            None => warn!("Dropping malformed tool call: {}", raw),
        }
    }

    // Otherwise the agent would stop on an empty turn and answer ""
    if content.is_empty() && tool_calls.is_empty() && !raw_calls.is_empty() {
        return Err(anyhow!(
            "Model replied only with {} malformed tool call(s)",
            raw_calls.len()
        ));
    }

    Ok(AgentMessage::Ai {
        content,
        tool_calls,
    })
}

fn parse_tool_call(call: &Value) -> Option<ToolCall> {
    let function = call.get("function")?;
    let name = function.get("name")?.as_str()?.to_string();
    let id = call
        .get("id")
        .and_then(|id| id.as_str())
        .unwrap_or_default()
        .to_string();

    // Arguments arrive as a JSON-encoded string; keep the raw text if it does not parse
    let arguments = match function.get("arguments") {
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
        }
        Some(other) => other.clone(),
        None => json!({}),
    };

    Some(ToolCall {
        id,
        name,
        arguments,
    })
}
