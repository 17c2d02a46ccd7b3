//! Tools the agent may call between model turns.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::Settings;
use crate::model::ToolSpec;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object
    fn parameters(&self) -> Value;

    /// Run the tool; the returned text is handed back to the model verbatim.
    async fn call(&self, arguments: &Value) -> Result<String>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Web search backed by the Tavily API
pub struct TavilySearch {
    base_url: String,
    api_key: Option<String>,
    max_results: usize,
    client: Client,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

impl TavilySearch {
    pub const NAME: &'static str = "tavily_search";

    pub fn new(client: Client, settings: &Settings) -> Self {
        Self {
            base_url: settings.tavily_base_url.trim_end_matches('/').to_string(),
            api_key: settings.tavily_api_key.clone(),
            max_results: settings.search_max_results,
            client,
        }
    }
}

#[async_trait]
impl Tool for TavilySearch {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "A search engine optimized for comprehensive, accurate, and trusted results. \
         Useful for when you need to answer questions about current events. \
         Input should be a search query."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query to look up"
                }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, arguments: &Value) -> Result<String> {
        let query = search_query(arguments)?;
        info!("Searching the web for: {}", query);

        let payload = json!({
            "query": query,
            "max_results": self.max_results,
            "search_depth": "basic",
            "topic": "general",
        });

        let mut request = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&payload);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(anyhow!("Tavily search failed ({}): {}", status, error_text));
        }

        let results: SearchResponse = response.json().await?;
        debug!("Search returned {} results", results.results.len());
        Ok(serde_json::to_string(&results)?)
    }
}

fn search_query(arguments: &Value) -> Result<&str> {
    arguments
        .get("query")
        .and_then(|q| q.as_str())
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| anyhow!("tavily_search requires a non-empty `query` argument"))
}
