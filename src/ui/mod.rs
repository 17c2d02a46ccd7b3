//! Chat front-end: a server-rendered page that keeps one transcript per
//! browser session and forwards it to the backend.

pub mod client;
pub mod handlers;
pub mod markdown;
pub mod routes;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use actix_files as fs;
use actix_web::{dev::Server, web::Data, App, HttpServer};
use anyhow::Context as _;
use log::{debug, info};
use serde::Serialize;
use tera::Tera;
use uuid::Uuid;

use crate::config::Settings;
use crate::web::models::ChatMessage;
use client::ChatBackend;

/// One-shot message shown above the transcript on the next render
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Notice {
    Success(String),
    Error(String),
}

// Per-session chat state; system turns never enter the transcript
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub transcript: Vec<ChatMessage>,
    pub system_prompt: String,
    pub model: String,
    pub allow_search: bool,
    #[serde(skip)]
    pub notice: Option<Notice>,
    #[serde(skip)]
    pub last_seen: Instant,
}

impl Session {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            transcript: Vec::new(),
            system_prompt: String::new(),
            model: model.into(),
            allow_search: false,
            notice: None,
            last_seen: Instant::now(),
        }
    }

    /// Transcript turns with their content rendered from markdown
    pub fn turns(&self) -> Vec<Turn<'_>> {
        self.transcript
            .iter()
            .map(|message| Turn {
                role: &message.role,
                html: markdown::to_html(&message.content),
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct Turn<'a> {
    pub role: &'a str,
    pub html: String,
}

pub struct UiState {
    pub tera: Tera,
    pub backend: Arc<dyn ChatBackend>,
    pub models: Vec<String>,
    pub sessions: Mutex<HashMap<Uuid, Session>>,
    pub idle_timeout: Duration,
    pub max_sessions: usize,
}

impl UiState {
    pub fn new(tera: Tera, backend: Arc<dyn ChatBackend>, settings: &Settings) -> Self {
        Self {
            tera,
            backend,
            models: settings.allowed_models().iter().map(|m| m.to_string()).collect(),
            sessions: Mutex::new(HashMap::new()),
            idle_timeout: settings.session_idle_timeout,
            max_sessions: settings.max_sessions,
        }
    }

    pub fn default_model(&self) -> &str {
        self.models.first().map(String::as_str).unwrap_or_default()
    }

    /// Existing session for `id`, or a new one once idle and surplus
    /// sessions have been evicted.
    pub fn touch_session<'a>(
        &self,
        sessions: &'a mut HashMap<Uuid, Session>,
        id: Uuid,
    ) -> &'a mut Session {
        if !sessions.contains_key(&id) {
            self.evict(sessions);
        }
        let session = sessions
            .entry(id)
            .or_insert_with(|| Session::new(self.default_model()));
        session.last_seen = Instant::now();
        session
    }

    fn evict(&self, sessions: &mut HashMap<Uuid, Session>) {
        let before = sessions.len();
        sessions.retain(|_, session| session.last_seen.elapsed() < self.idle_timeout);

        while !sessions.is_empty() && sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, session)| session.last_seen)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                }
                None => break,
            }
        }

        if sessions.len() < before {
            debug!("Evicted {} chat sessions", before - sessions.len());
        }
    }
}

pub fn load_templates(glob: &str) -> anyhow::Result<Tera> {
    let mut tera = Tera::new(glob).with_context(|| format!("Template parsing error in {}", glob))?;
    tera.autoescape_on(vec![".html", ".sql"]);
    Ok(tera)
}

/// Bind the front-end and return the not-yet-awaited server.
pub fn server(settings: &Settings, state: UiState) -> std::io::Result<Server> {
    let bind = (settings.frontend_host.clone(), settings.frontend_port);
    let static_dir = settings.static_dir.clone();
    let state = Data::new(state);

    info!("Chat front-end listening on http://{}:{}", bind.0, bind.1);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes::configure)
            .service(fs::Files::new("/static", &static_dir))
    })
    .bind(bind)?
    .run();

    Ok(server)
}
