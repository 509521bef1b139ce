//! Service-level health and metrics endpoints, plus the capability report shared by the
//! per-group `/health` routes.
//!
//! None of these probe the external providers. "configured" only says whether the
//! credentials a group needs were present when the server started.

use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::{json, Value};

/// Body for `GET /api/<group>/health`.
///
/// `extra` must be a JSON object; its keys are merged into the top level.
pub fn capability_report(service: &str, configured: bool, extra: Value) -> HttpResponse {
    let mut body = json!({
        "success": true,
        "service": service,
        "configured": configured,
        "timestamp": chrono::Utc::now().to_rfc3339()
    });
    if let (Some(body), Value::Object(extra)) = (body.as_object_mut(), extra) {
        body.extend(extra);
    }
    HttpResponse::Ok().json(body)
}

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let credentials = &state.credentials;

    HttpResponse::Ok().json(json!({
        "success": true,
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.get_uptime_seconds(),
        "service": {
            "name": "kre8-backend",
            "version": env!("CARGO_PKG_VERSION")
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": if metrics.request_count > 0 {
                metrics.error_count as f64 / metrics.request_count as f64
            } else {
                0.0
            }
        },
        "services": {
            "music": credentials.generation_configured(),
            "transcription": credentials.transcription_configured(),
            "feedback": credentials.feedback_configured(),
            "realtime": credentials.realtime_configured()
        }
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats: Vec<Value> = metrics
        .endpoint_metrics
        .iter()
        .map(|(endpoint, metric)| {
            json!({
                "endpoint": endpoint,
                "request_count": metric.request_count,
                "error_count": metric.error_count,
                "error_rate": metric.error_rate(),
                "average_duration_ms": metric.average_duration_ms(),
                "total_duration_ms": metric.total_duration_ms
            })
        })
        .collect();
    endpoint_stats.sort_by(|a, b| a["endpoint"].as_str().cmp(&b["endpoint"].as_str()));

    HttpResponse::Ok().json(json!({
        "success": true,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "endpoints": endpoint_stats
    }))
}
