use actix_web::{web, HttpResponse, Responder};
use log::{error, info, warn};
use serde_json::json;
use uuid::Uuid;

use crate::agent::AgentRequest;
use crate::error::ApiError;
use crate::web::models::{to_agent_messages, ChatRequest, ChatResponse};
use crate::web::AppState;

// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

// Chat API endpoint
pub async fn chat(
    data: web::Data<AppState>,
    req: web::Json<ChatRequest>,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let req = req.into_inner();
    info!("[{}] Received request for model: {}", request_id, req.model_name);

    if !data.settings.is_allowed_model(&req.model_name) {
        warn!("[{}] Invalid model name: {}", request_id, req.model_name);
        return Err(ApiError::Validation("Invalid model name".to_string()));
    }

    let messages = to_agent_messages(&req.messages).map_err(|e| {
        error!("[{}] Validation error: {}", request_id, e);
        e
    })?;

    let request = AgentRequest {
        llm_id: req.model_name.clone(),
        messages,
        allow_search: req.allow_search,
        system_prompt: req.system_prompt,
    };

    match data.agent.respond(request).await {
        Ok(response) => {
            info!("[{}] Successfully generated AI response {}", request_id, req.model_name);
            Ok(HttpResponse::Ok().json(ChatResponse {
                request_id,
                model: req.model_name,
                response,
            }))
        }
        Err(e) => {
            error!("[{}] Error during response generation: {:#}", request_id, e);
            Err(ApiError::internal(format!("{:#}", e)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentBackend;
    use crate::config::Settings;
    use crate::error::ErrorBody;
    use crate::web::routes;
    use actix_web::{http::StatusCode, test, App};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingAgent {
        calls: AtomicUsize,
        last: Mutex<Option<AgentRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl AgentBackend for RecordingAgent {
        async fn respond(&self, request: AgentRequest) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(request);
            if self.fail {
                anyhow::bail!("groq unreachable");
            }
            Ok("Paris.".to_string())
        }
    }

    fn state(agent: Arc<RecordingAgent>) -> web::Data<AppState> {
        web::Data::new(AppState {
            settings: Arc::new(Settings::default()),
            agent,
        })
    }

    #[actix_web::test]
    async fn chat_returns_agent_answer() {
        let agent = Arc::new(RecordingAgent::default());
        let app = test::init_service(
            App::new().app_data(state(agent.clone())).configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(json!({
                "model_name": "llama-3.1-8b-instant",
                "system_prompt": "Answer briefly.",
                "messages": [{ "role": "User", "content": "Capital of France?" }],
                "allow_search": true
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: ChatResponse = test::read_body_json(resp).await;
        assert_eq!(body.model, "llama-3.1-8b-instant");
        assert_eq!(body.response, "Paris.");

        let last = agent.last.lock().unwrap().take().unwrap();
        assert!(last.allow_search);
        assert_eq!(last.system_prompt.as_deref(), Some("Answer briefly."));
        assert_eq!(last.messages.len(), 1);
    }

    #[actix_web::test]
    async fn unknown_model_is_rejected_before_agent_call() {
        let agent = Arc::new(RecordingAgent::default());
        let app = test::init_service(
            App::new().app_data(state(agent.clone())).configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(json!({
                "model_name": "gpt-4o",
                "system_prompt": "",
                "messages": [{ "role": "user", "content": "hi" }],
                "allow_search": false
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.detail, "Invalid model name");
        assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn unknown_role_is_a_client_error() {
        let agent = Arc::new(RecordingAgent::default());
        let app = test::init_service(
            App::new().app_data(state(agent.clone())).configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(json!({
                "model_name": "llama-3.1-8b-instant",
                "messages": [{ "role": "tool", "content": "{}" }],
                "allow_search": false
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.detail, "Invalid role: tool");
        assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn agent_failure_is_an_internal_error() {
        let agent = Arc::new(RecordingAgent {
            fail: true,
            ..Default::default()
        });
        let app = test::init_service(
            App::new().app_data(state(agent.clone())).configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(json!({
                "model_name": "meta-llama/llama-guard-4-12b",
                "messages": [{ "role": "user", "content": "hi" }],
                "allow_search": false
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.detail, "Failed to get AI response: groq unreachable");
    }

    #[actix_web::test]
    async fn malformed_body_reports_detail() {
        let agent = Arc::new(RecordingAgent::default());
        let app = test::init_service(
            App::new().app_data(state(agent.clone())).configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(json!({ "messages": "not a list" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body: ErrorBody = test::read_body_json(resp).await;
        assert!(!body.detail.is_empty());
        assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn oversized_body_is_payload_too_large() {
        let agent = Arc::new(RecordingAgent::default());
        let app = test::init_service(
            App::new()
                .app_data(state(agent.clone()))
                .configure(|cfg| routes::configure_with_limit(cfg, 256)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/chat")
            .set_json(json!({
                "model_name": "llama-3.1-8b-instant",
                "messages": [{ "role": "user", "content": "x".repeat(1024) }],
                "allow_search": false
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let body: ErrorBody = test::read_body_json(resp).await;
        assert!(!body.detail.is_empty());
        assert_eq!(agent.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn health_is_ok() {
        let app = test::init_service(
            App::new()
                .app_data(state(Arc::new(RecordingAgent::default())))
                .configure(routes::configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "status": "ok" }));
    }
}
