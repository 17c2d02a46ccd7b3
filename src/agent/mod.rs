//! ReAct-style agent: the model reasons, optionally calls tools, observes
//! their output and repeats until it answers without a tool call.

pub mod tools;

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use thiserror::Error;

use crate::config::Settings;
use crate::model::{AgentMessage, ChatModel, GroqModel, ToolCall, ToolSpec};
use tools::{TavilySearch, Tool};

/// Returned when the agent finishes without any AI-authored message
pub const FALLBACK_RESPONSE: &str = "No response generated.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Agent stopped after {0} model calls without a final answer")]
    MaxIterationsReached(usize),
    #[error("Model error: {0:#}")]
    Model(anyhow::Error),
}

/// Everything the HTTP layer hands to the agent for one request
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub llm_id: String,
    pub messages: Vec<AgentMessage>,
    pub allow_search: bool,
    pub system_prompt: Option<String>,
}

/// Seam between the HTTP layer and whatever produces the answer.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn respond(&self, request: AgentRequest) -> anyhow::Result<String>;
}

pub struct ReactAgent {
    model: Box<dyn ChatModel>,
    tools: Vec<Box<dyn Tool>>,
    max_iterations: usize,
}

impl ReactAgent {
    pub fn new(model: Box<dyn ChatModel>, tools: Vec<Box<dyn Tool>>, max_iterations: usize) -> Self {
        Self {
            model,
            tools,
            max_iterations,
        }
    }

    /// Run the loop and return the full conversation state, input included.
    pub async fn invoke(&self, mut messages: Vec<AgentMessage>) -> Result<Vec<AgentMessage>, AgentError> {
        let specs: Vec<ToolSpec> = self.tools.iter().map(|tool| tool.spec()).collect();
        let mut iterations = 0;

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                warn!("Agent hit the limit of {} model calls", self.max_iterations);
                return Err(AgentError::MaxIterationsReached(self.max_iterations));
            }

            let reply = self
                .model
                .invoke(&messages, &specs)
                .await
                .map_err(AgentError::Model)?;

            let calls = match &reply {
                AgentMessage::Ai { tool_calls, .. } => tool_calls.clone(),
                _ => Vec::new(),
            };
            messages.push(reply);

            if calls.is_empty() {
                info!("Agent finished after {} model calls", iterations);
                return Ok(messages);
            }

            for call in calls {
                let content = self.run_tool(&call).await;
                messages.push(AgentMessage::Tool {
                    content,
                    tool_call_id: call.id,
                    name: call.name,
                });
            }
        }
    }

    // Tool failures go back to the model as text so it can recover
    async fn run_tool(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.iter().find(|tool| tool.name() == call.name) else {
            let names: Vec<&str> = self.tools.iter().map(|tool| tool.name()).collect();
            warn!("Model requested unknown tool {}", call.name);
            return format!(
                "Error: {} is not a valid tool, try one of [{}].",
                call.name,
                names.join(", ")
            );
        };

        debug!("Calling tool {} with {}", call.name, call.arguments);
        match tool.call(&call.arguments).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Tool {} failed: {:#}", call.name, e);
                format!("Error: {:#}", e)
            }
        }
    }
}

/// Content of the last AI message, or the fallback when there is none.
pub fn extract_final_answer(messages: &[AgentMessage]) -> String {
    messages
        .iter()
        .rev()
        .find(|message| message.is_ai())
        .map(|message| message.content().to_string())
        .unwrap_or_else(|| FALLBACK_RESPONSE.to_string())
}

/// Prepend the system prompt (when non-empty), run the agent and extract the answer.
pub async fn get_response(
    agent: &ReactAgent,
    messages: Vec<AgentMessage>,
    system_prompt: Option<&str>,
) -> Result<String, AgentError> {
    let query = match system_prompt.filter(|prompt| !prompt.is_empty()) {
        Some(prompt) => std::iter::once(AgentMessage::system(prompt))
            .chain(messages)
            .collect(),
        None => messages,
    };

    let state = agent.invoke(query).await?;
    Ok(extract_final_answer(&state))
}

/// Production backend: Groq for the model, Tavily when search is allowed
pub struct ReactBackend {
    client: Client,
    settings: Arc<Settings>,
}

impl ReactBackend {
    pub fn new(settings: Arc<Settings>) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self { client, settings })
    }

    fn build_agent(&self, llm_id: &str, allow_search: bool) -> ReactAgent {
        let model = GroqModel::new(self.client.clone(), &self.settings, llm_id);
        let tools: Vec<Box<dyn Tool>> = if allow_search {
            vec![Box::new(TavilySearch::new(self.client.clone(), &self.settings))]
        } else {
            Vec::new()
        };
        ReactAgent::new(Box::new(model), tools, self.settings.max_iterations)
    }
}

#[async_trait]
impl AgentBackend for ReactBackend {
    async fn respond(&self, request: AgentRequest) -> anyhow::Result<String> {
        let agent = self.build_agent(&request.llm_id, request.allow_search);
        let answer = get_response(&agent, request.messages, request.system_prompt.as_deref()).await?;
        Ok(answer)
    }
}
