use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::config::Settings;
use crate::web::models::ChatRequest;

#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend answered with a non-200 status; holds its `detail`
    #[error("{0}")]
    Rejected(String),
    #[error("Failed to communicate with backend: {0}")]
    Transport(#[from] reqwest::Error),
}

/// How the front-end reaches the chat backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<String, BackendError>;
}

pub struct HttpBackend {
    chat_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        Ok(Self {
            chat_url: settings.backend_chat_url(),
            client,
        })
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send(&self, request: &ChatRequest) -> Result<String, BackendError> {
        debug!("POST {} with {} messages", self.chat_url, request.messages.len());
        let response = self.client.post(&self.chat_url).json(request).send().await?;

        if response.status() == StatusCode::OK {
            let body: Value = response.json().await?;
            return Ok(field_or(&body, "response", ""));
        }

        // Error bodies are best effort; fall back to a fixed message
        let detail = match response.json::<Value>().await {
            Ok(body) => field_or(&body, "detail", "Error from backend"),
            Err(_) => "Error from backend".to_string(),
        };
        Err(BackendError::Rejected(detail))
    }
}

fn field_or(body: &Value, key: &str, default: &str) -> String {
    body.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or(default)
        .to_string()
}
