//! Starts the backend and front-end together in one process.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use log::{error, info};
use reqwest::{Client, StatusCode};

use crate::agent::{AgentBackend, ReactBackend};
use crate::config::Settings;
use crate::ui::{self, client::HttpBackend, UiState};
use crate::web;

const STARTUP_TIMEOUT: Duration = Duration::from_secs(15);
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll `health_url` until it answers 200 or `timeout` elapses.
pub async fn wait_for_backend(
    client: &Client,
    health_url: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<()> {
    info!("Waiting for backend to become ready...");
    let start = Instant::now();

    while start.elapsed() < timeout {
        match client.get(health_url).send().await {
            Ok(response) if response.status() == StatusCode::OK => {
                info!("Backend is ready.");
                return Ok(());
            }
            _ => tokio::time::sleep(interval).await,
        }
    }

    bail!("Backend did not start within expected time.")
}

pub async fn run_backend(settings: Arc<Settings>) -> Result<()> {
    info!("Starting backend service...");
    let agent: Arc<dyn AgentBackend> = Arc::new(ReactBackend::new(settings.clone())?);
    web::server(settings, agent)?.await?;
    Ok(())
}

pub async fn run_frontend(settings: Arc<Settings>) -> Result<()> {
    info!("Starting frontend service...");
    let tera = ui::load_templates(&settings.templates)?;
    let backend = Arc::new(HttpBackend::new(&settings)?);
    let state = UiState::new(tera, backend, &settings);
    ui::server(&settings, state)?.await?;
    Ok(())
}

/// Backend first, then the front-end once `/health` answers.
pub async fn run_all(settings: Arc<Settings>) -> Result<()> {
    info!("Starting backend service...");
    let agent: Arc<dyn AgentBackend> = Arc::new(ReactBackend::new(settings.clone())?);
    let backend = web::server(settings.clone(), agent)?;
    let handle = backend.handle();
    actix_web::rt::spawn(async move {
        if let Err(e) = backend.await {
            error!("Backend process crashed: {}", e);
        }
    });

    let client = Client::builder().timeout(POLL_INTERVAL).build()?;
    if let Err(e) = wait_for_backend(&client, &settings.backend_health_url(), STARTUP_TIMEOUT, POLL_INTERVAL).await {
        handle.stop(true).await;
        return Err(e);
    }

    let result = run_frontend(settings).await;
    handle.stop(true).await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn gives_up_when_backend_never_answers() {
        let client = Client::new();
        let err = wait_for_backend(
            &client,
            "http://127.0.0.1:1/health",
            Duration::from_millis(300),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Backend did not start within expected time.");
    }
}
