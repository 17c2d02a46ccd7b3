//! Backend HTTP service: validates chat requests and hands them to the agent.

pub mod handlers;
pub mod models;
pub mod routes;

use std::sync::Arc;

use actix_web::{dev::Server, web::Data, App, HttpServer};
use log::info;

use crate::agent::AgentBackend;
use crate::config::Settings;

// Shared, read-only state for backend handlers
pub struct AppState {
    pub settings: Arc<Settings>,
    pub agent: Arc<dyn AgentBackend>,
}

/// Bind the backend and return the not-yet-awaited server.
pub fn server(settings: Arc<Settings>, agent: Arc<dyn AgentBackend>) -> std::io::Result<Server> {
    let bind = (settings.backend_host.clone(), settings.backend_port);
    let max_body_bytes = settings.max_body_bytes;
    let state = Data::new(AppState { settings, agent });

    info!("Backend listening on {}:{}", bind.0, bind.1);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(|cfg| routes::configure_with_limit(cfg, max_body_bytes))
    })
    .bind(bind)?
    .run();

    Ok(server)
}
