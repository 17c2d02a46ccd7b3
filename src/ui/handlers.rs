use std::collections::HashMap;
use std::sync::MutexGuard;
use std::time::Instant;

use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{error, web, HttpRequest, HttpResponse, HttpResponseBuilder};
use log::{error, info, warn};
use serde::Deserialize;
use tera::Context;
use uuid::Uuid;

use crate::ui::client::BackendError;
use crate::ui::{Notice, Session, UiState};
use crate::web::models::{ChatMessage, ChatRequest, Role};

pub const SESSION_COOKIE: &str = "session_id";

#[derive(Debug, Deserialize)]
pub struct SendForm {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub system_prompt: String,
    pub model: Option<String>,
    /// Present (as "on") only when the checkbox is ticked
    pub allow_search: Option<String>,
}

// Existing session id from the cookie, or a fresh one
fn session_id(req: &HttpRequest) -> (Uuid, bool) {
    req.cookie(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
        .map(|id| (id, false))
        .unwrap_or_else(|| (Uuid::new_v4(), true))
}

fn attach_session(builder: &mut HttpResponseBuilder, id: Uuid, is_new: bool) {
    if is_new {
        builder.cookie(
            Cookie::build(SESSION_COOKIE, id.to_string())
                .path("/")
                .http_only(true)
                .finish(),
        );
    }
}

fn lock_sessions(data: &UiState) -> Result<MutexGuard<'_, HashMap<Uuid, Session>>, error::Error> {
    data.sessions.lock().map_err(|e| {
        error!("Failed to lock sessions mutex: {}", e);
        error::ErrorInternalServerError("Internal server error")
    })
}

fn redirect_home(id: Uuid, is_new: bool) -> HttpResponse {
    let mut builder = HttpResponse::SeeOther();
    builder.insert_header((header::LOCATION, "/"));
    attach_session(&mut builder, id, is_new);
    builder.finish()
}

// Chat page
pub async fn index(req: HttpRequest, data: web::Data<UiState>) -> Result<HttpResponse, error::Error> {
    let (id, is_new) = session_id(&req);

    // Only POST /chat creates a session; unknown visitors see a blank page
    let (session, notice) = {
        let mut sessions = lock_sessions(&data)?;
        match sessions.get_mut(&id) {
            Some(session) => {
                session.last_seen = Instant::now();
                let notice = session.notice.take();
                (session.clone(), notice)
            }
            None => (Session::new(data.default_model()), None),
        }
    };

    let mut context = Context::new();
    context.insert("session", &session);
    context.insert("turns", &session.turns());
    context.insert("models", &data.models);
    context.insert("notice", &notice);

    match data.tera.render("index.html", &context) {
        Ok(html) => {
            let mut builder = HttpResponse::Ok();
            attach_session(&mut builder, id, is_new);
            Ok(builder.content_type("text/html").body(html))
        }
        Err(e) => {
            error!("Template error: {}", e);
            Ok(HttpResponse::InternalServerError().body("Template error"))
        }
    }
}

// Submit a user turn and wait for the agent's answer
pub async fn send(
    req: HttpRequest,
    data: web::Data<UiState>,
    form: web::Form<SendForm>,
) -> Result<HttpResponse, error::Error> {
    let (id, is_new) = session_id(&req);
    let form = form.into_inner();
    let message = form.message.trim();

    let payload = {
        let mut sessions = lock_sessions(&data)?;
        let session = data.touch_session(&mut sessions, id);

        session.system_prompt = form.system_prompt.clone();
        session.allow_search = form.allow_search.is_some();
        if let Some(model) = form.model.filter(|m| !m.is_empty()) {
            session.model = model;
        }

        if message.is_empty() {
            return Ok(redirect_home(id, is_new));
        }

        session.transcript.push(ChatMessage::new(Role::User, message));
        ChatRequest {
            model_name: session.model.clone(),
            system_prompt: Some(session.system_prompt.clone()),
            messages: session.transcript.clone(),
            allow_search: session.allow_search,
        }
    };

    // The lock is released while the backend works
    info!("Sending request to backend");
    let result = data.backend.send(&payload).await;

    let mut sessions = lock_sessions(&data)?;
    let Some(session) = sessions.get_mut(&id) else {
        warn!("Session {} expired while waiting for the backend", id);
        return Ok(redirect_home(id, is_new));
    };
    match result {
        Ok(answer) => {
            session.transcript.push(ChatMessage::new(Role::Assistant, answer));
            info!("Successfully received response from backend");
        }
        Err(BackendError::Rejected(detail)) => {
            error!("Backend returned error: {}", detail);
            session.notice = Some(Notice::Error(detail));
        }
        Err(e @ BackendError::Transport(_)) => {
            error!("Error communicating with backend: {}", e);
            session.notice = Some(Notice::Error("Failed to communicate with backend".to_string()));
        }
    }

    Ok(redirect_home(id, is_new))
}

// Reset the conversation memory
pub async fn clear(req: HttpRequest, data: web::Data<UiState>) -> Result<HttpResponse, error::Error> {
    let (id, is_new) = session_id(&req);
    {
        let mut sessions = lock_sessions(&data)?;
        if let Some(session) = sessions.get_mut(&id) {
            session.transcript.clear();
            session.last_seen = Instant::now();
            session.notice = Some(Notice::Success("Chat cleared!".to_string()));
        }
    }
    Ok(redirect_home(id, is_new))
}
