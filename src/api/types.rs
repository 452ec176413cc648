//! API Request/Response Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::models::{AppError, IocRecord};

/// Error body: `{ "error": message, "code": ERROR_CODE }`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("❌ {}", self);
        }

        let body = ErrorBody {
            error: self.message,
            code: self.code.as_str().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ============================================
// IOC Lookup
// ============================================

/// Both fields are optional so a missing one maps to our own 400
#[derive(Debug, Default, Deserialize)]
pub struct LookupRequest {
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub ioc_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    #[serde(flatten)]
    pub record: IocRecord,
    pub cached: bool,
}

// ============================================
// Recent Lookups
// ============================================

/// Raw so that garbage falls back to the default instead of a 400
#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<String>,
}

// ============================================
// Health Check
// ============================================

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub status: String,
    pub timestamp: String,
    pub store: String,
    pub records: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
