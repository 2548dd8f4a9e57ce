pub mod appointments;
pub mod auth;
pub mod cases;
pub mod constitutions;
pub mod documents;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod swagger;
pub mod uploads;

use crate::utils::AppError;
use actix_web::{error, web, HttpResponse, ResponseError};

/// Logs a failed request by severity and renders the error envelope.
pub fn error_response(route: &str, err: AppError) -> HttpResponse {
    if err.is_server_error() {
        log::error!("❌ {} failed: {}", route, err);
    } else {
        log::warn!("⚠️  {} rejected: {}", route, err);
    }
    err.error_response()
}

// Extractor failures use the same `{ success: false, message }` envelope.

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = match &err {
            error::JsonPayloadError::Deserialize(e) => e.to_string(),
            other => other.to_string(),
        };
        error::Error::from(AppError::validation(message))
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| error::Error::from(AppError::validation(err.to_string())))
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| error::Error::from(AppError::validation(err.to_string())))
}
