//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so it can be grepped in logs
//! and mapped to an HTTP status in one place.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - API_xxx: API errors
//! - IOC_xxx: Indicator validation errors
//! - PROVIDER_xxx: Threat-intel / GeoIP upstream errors
//! - CFG_xxx: Configuration errors
//! - STORE_xxx: Store / snapshot errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // API Errors
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,
    /// Resource not found
    ApiNotFound,

    // ============================================
    // Indicator Errors
    // ============================================
    /// Value does not match its declared IOC type
    IocInvalidValue,
    /// IOC type is not one of ip/domain/hash/url
    IocUnsupportedType,

    // ============================================
    // Provider Errors
    // ============================================
    /// Provider answered with a non-success status
    ProviderError,
    /// Provider request timed out
    ProviderTimeout,
    /// Provider could not be reached
    ProviderConnectionFailed,
    /// Provider body did not match the expected shape
    ProviderInvalidResponse,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Store Errors
    // ============================================
    /// Snapshot could not be read or written
    StoreIo,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",
            Self::ApiNotFound => "API_NOT_FOUND",

            Self::IocInvalidValue => "IOC_INVALID_VALUE",
            Self::IocUnsupportedType => "IOC_UNSUPPORTED_TYPE",

            Self::ProviderError => "PROVIDER_ERROR",
            Self::ProviderTimeout => "PROVIDER_TIMEOUT",
            Self::ProviderConnectionFailed => "PROVIDER_CONNECTION_FAILED",
            Self::ProviderInvalidResponse => "PROVIDER_INVALID_RESPONSE",

            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            Self::StoreIo => "STORE_IO",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest | Self::IocInvalidValue | Self::IocUnsupportedType => 400,
            Self::ApiNotFound => 404,
            Self::ApiRateLimited => 429,
            Self::ProviderError
            | Self::ProviderConnectionFailed
            | Self::ProviderInvalidResponse => 502,
            Self::ProviderTimeout => 504,
            _ => 500,
        }
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// Resource not found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiNotFound, msg)
    }

    /// Rate limited, with the seconds until the window resets
    pub fn rate_limited(retry_after: u64) -> Self {
        Self::new(
            ErrorCode::ApiRateLimited,
            format!("Rate limit exceeded. Retry after {} seconds", retry_after),
        )
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }

    /// Indicator value rejected by validation
    pub fn invalid_indicator(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::IocInvalidValue, msg)
    }

    /// IOC type outside ip/domain/hash/url
    pub fn unsupported_type(kind: &str) -> Self {
        Self::new(
            ErrorCode::IocUnsupportedType,
            format!("Unsupported IOC type: {}", kind),
        )
    }

    /// Upstream provider answered with an error status
    pub fn provider(provider: &str, status: u16) -> Self {
        Self::new(
            ErrorCode::ProviderError,
            format!("{} returned HTTP {}", provider, status),
        )
    }

    /// Invalid configuration value
    pub fn invalid_config(key: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {:?}", key, value),
        )
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::StoreIo, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::ProviderTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::ProviderConnectionFailed, "Connection failed")
        } else if err.is_decode() {
            Self::with_source(ErrorCode::ProviderInvalidResponse, "Malformed response body", err)
        } else if let Some(status) = err.status() {
            Self::new(ErrorCode::ProviderError, format!("HTTP {}", status.as_u16()))
        } else {
            Self::new(ErrorCode::Unknown, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::StoreIo, "JSON parse error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::invalid_indicator("not an ip");
        assert_eq!(err.code, ErrorCode::IocInvalidValue);
        assert_eq!(err.code.as_str(), "IOC_INVALID_VALUE");
        assert_eq!(err.to_string(), "[IOC_INVALID_VALUE] not an ip");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::ApiBadRequest.http_status(), 400);
        assert_eq!(ErrorCode::IocUnsupportedType.http_status(), 400);
        assert_eq!(ErrorCode::ApiNotFound.http_status(), 404);
        assert_eq!(ErrorCode::ApiRateLimited.http_status(), 429);
        assert_eq!(ErrorCode::ProviderTimeout.http_status(), 504);
        assert_eq!(ErrorCode::StoreIo.http_status(), 500);
    }

    #[test]
    fn test_io_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AppError = io.into();
        assert_eq!(err.code, ErrorCode::StoreIo);
        assert!(std::error::Error::source(&err).is_some());
    }
}
