use crate::config::ConfigError;
use crate::registration::export::ExportError;
use crate::registration::visitor::{GatewayError, IpLookupError, WizardError};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Application-level failure surfaced by the kiosk binary and HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("wizard error: {0}")]
    Wizard(#[from] WizardError),
    #[error("registration backend error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("ip lookup error: {0}")]
    IpLookup(#[from] IpLookupError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Wizard(_) => StatusCode::CONFLICT,
            AppError::Gateway(_) | AppError::IpLookup(_) => StatusCode::BAD_GATEWAY,
            AppError::Export(ExportError::NoVisitors) => StatusCode::NOT_FOUND,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
