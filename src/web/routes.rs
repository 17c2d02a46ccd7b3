use actix_web::error::JsonPayloadError;
use actix_web::web;

use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::error::ApiError;
use crate::web::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    configure_with_limit(cfg, DEFAULT_MAX_BODY_BYTES);
}

pub fn configure_with_limit(cfg: &mut web::ServiceConfig, max_body_bytes: usize) {
    let json_config = web::JsonConfig::default()
        .limit(max_body_bytes)
        .error_handler(|err, _req| {
            let api_error = match err {
                JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
                    ApiError::PayloadTooLarge(err.to_string())
                }
                _ => ApiError::Malformed(err.to_string()),
            };
            api_error.into()
        });

    cfg.app_data(json_config)
        .route("/chat", web::post().to(handlers::chat))
        .route("/health", web::get().to(handlers::health_check));
}
