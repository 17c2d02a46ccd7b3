use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Model identifiers the backend accepts. Anything else is rejected before
/// the provider is contacted.
pub const ALLOWED_MODEL_NAMES: &[&str] = &[
    "llama-3.1-8b-instant",
    "meta-llama/llama-guard-4-12b",
    "meta-llama/Llama-3.1-8B",
];

const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Default cap on a `POST /chat` body; the front-end resends the whole transcript
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

// Runtime settings, read once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub groq_api_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub groq_base_url: String,
    pub tavily_base_url: String,
    pub backend_host: String,
    pub backend_port: u16,
    pub frontend_host: String,
    pub frontend_port: u16,
    /// Base URL the front-end uses to reach the backend
    pub backend_url: String,
    pub temperature: f32,
    /// Upper bound on model calls within one agent run
    pub max_iterations: usize,
    pub search_max_results: usize,
    pub request_timeout: Duration,
    /// Front-end sessions untouched for this long are dropped
    pub session_idle_timeout: Duration,
    pub max_sessions: usize,
    /// Largest accepted `POST /chat` body
    pub max_body_bytes: usize,
    pub templates: String,
    pub static_dir: String,
}

impl Settings {
    /// Load settings from the process environment (after `.env`, if any).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_host = lookup("BACKEND_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let backend_port = parse_or(&lookup, "BACKEND_PORT", 9999);
        let backend_url = lookup("BACKEND_URL")
            .unwrap_or_else(|| format!("http://{}:{}", backend_host, backend_port));

        Self {
            groq_api_key: lookup("GROQ_API_KEY").filter(|k| !k.is_empty()),
            tavily_api_key: lookup("TAVILY_API_KEY").filter(|k| !k.is_empty()),
            groq_base_url: lookup("GROQ_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string()),
            tavily_base_url: lookup("TAVILY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_TAVILY_BASE_URL.to_string()),
            backend_host,
            backend_port,
            frontend_host: lookup("FRONTEND_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            frontend_port: parse_or(&lookup, "FRONTEND_PORT", 8501),
            backend_url: backend_url.trim_end_matches('/').to_string(),
            temperature: parse_or(&lookup, "TEMPERATURE", 0.7),
            max_iterations: parse_or(&lookup, "MAX_ITERATIONS", 25),
            search_max_results: parse_or(&lookup, "SEARCH_MAX_RESULTS", 2),
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 60)),
            session_idle_timeout: Duration::from_secs(parse_or(&lookup, "SESSION_IDLE_SECS", 3600)),
            max_sessions: parse_or(&lookup, "MAX_SESSIONS", 1000),
            max_body_bytes: parse_or(&lookup, "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
            templates: lookup("TEMPLATES").unwrap_or_else(|| "templates/**/*".to_string()),
            static_dir: lookup("STATIC_DIR").unwrap_or_else(|| "./static".to_string()),
        }
    }

    pub fn is_allowed_model(&self, name: &str) -> bool {
        ALLOWED_MODEL_NAMES.contains(&name)
    }

    pub fn allowed_models(&self) -> &'static [&'static str] {
        ALLOWED_MODEL_NAMES
    }

    pub fn backend_chat_url(&self) -> String {
        format!("{}/chat", self.backend_url)
    }

    pub fn backend_health_url(&self) -> String {
        format!("{}/health", self.backend_url)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
