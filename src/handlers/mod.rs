//! HTTP request handlers, one module per route group under `/api`.

pub mod config;
pub mod feedback;
pub mod music;
pub mod realtime;
pub mod transcription;

use crate::error::AppError;
use crate::health;
use actix_web::web;

/// Largest JSON body accepted; generous enough for `currentCode` plus history.
const JSON_BODY_LIMIT: usize = 512 * 1024;

/// JSON extractor settings: malformed bodies get the standard 400 envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_BODY_LIMIT)
        .error_handler(|err, _req| {
            AppError::BadRequest(format!("Invalid JSON body: {}", err)).into()
        })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(format!("Invalid query string: {}", err)).into()
    })
}

/// Register every route. Shared by `main` and the handler tests.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .service(
            web::scope("/api")
                .route("/health", web::get().to(health::health_check))
                .route("/metrics", web::get().to(health::detailed_metrics))
                .service(
                    web::scope("/config")
                        .route("/health", web::get().to(config::health))
                        .route("/defaults", web::get().to(config::get_defaults))
                        .route("/models", web::get().to(config::get_models))
                        .route("/examples", web::get().to(config::get_examples))
                        .route("/sounds", web::get().to(config::get_sounds)),
                )
                .service(
                    web::scope("/music")
                        .route("/health", web::get().to(music::health))
                        .route("/generate", web::post().to(music::generate)),
                )
                .service(
                    web::scope("/transcription")
                        .route("/health", web::get().to(transcription::health))
                        .route("/transcribe", web::post().to(transcription::transcribe)),
                )
                .service(
                    web::scope("/feedback")
                        .route("", web::post().to(feedback::submit_feedback))
                        .route("/health", web::get().to(feedback::health))
                        .route("/search", web::post().to(feedback::search_feedback)),
                )
                .service(
                    web::scope("/realtime")
                        .route("/health", web::get().to(realtime::health))
                        .route("/voices", web::get().to(realtime::list_voices))
                        .route("/session", web::post().to(realtime::create_session)),
                ),
        )
        .route("/health", web::get().to(health::health_check));
}
