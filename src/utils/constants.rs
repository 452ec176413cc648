//! Constants Module - Single Source of Truth
//!
//! Endpoints, source names, scoring weights and limits used across the
//! application. No hardcoded values in other modules!

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for outbound HTTP requests
pub const USER_AGENT: &str = concat!("ThreatSentry/", env!("CARGO_PKG_VERSION"));

// ============================================
// SERVER DEFAULTS
// ============================================

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;

/// Origins allowed by CORS in addition to FRONTEND_URL
pub const DEV_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:3000"];

/// Requests per client per rate-limit window
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Maintenance task period (store pruning, rate-limiter cleanup)
pub const MAINTENANCE_INTERVAL_SECS: u64 = 60;

// ============================================
// STORE CONSTANTS
// ============================================

/// Freshness window: records younger than this are served from the store
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Upper bound on stored records before the oldest are pruned
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

/// `GET /api/ioc/recent` default and ceiling
pub const DEFAULT_RECENT_LIMIT: usize = 10;
pub const MAX_RECENT_LIMIT: usize = 100;

// ============================================
// PROVIDER CONSTANTS
// ============================================

/// Default timeout for upstream requests (seconds)
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_ABUSEIPDB_BASE_URL: &str = "https://api.abuseipdb.com";
pub const DEFAULT_VIRUSTOTAL_BASE_URL: &str = "https://www.virustotal.com";
pub const DEFAULT_OTX_BASE_URL: &str = "https://otx.alienvault.com";
pub const DEFAULT_GEOIP_BASE_URL: &str = "http://ip-api.com";

/// Source names as they appear in results
pub const SOURCE_ABUSEIPDB: &str = "AbuseIPDB";
pub const SOURCE_VIRUSTOTAL: &str = "VirusTotal";
pub const SOURCE_OTX: &str = "AlienVault OTX";

/// AbuseIPDB report look-back
pub const ABUSEIPDB_MAX_AGE_DAYS: u32 = 90;

/// OTX pulses whose names become categories
pub const OTX_MAX_PULSE_CATEGORIES: usize = 3;

/// Fixed detail strings for degraded sources
pub const DETAIL_NOT_CONFIGURED: &str = "API key not configured";
pub const DETAIL_UNSUPPORTED_TYPE: &str = "Unsupported type";
pub const DETAIL_API_ERROR: &str = "API error";
pub const DETAIL_NOT_FOUND: &str = "Not found or API error";

// ============================================
// SCORING CONSTANTS
// ============================================

/// Weight of a detecting source that reports no numeric score
pub const DEFAULT_DETECTION_WEIGHT: u32 = 30;

/// Maximum tags kept on a record
pub const MAX_TAGS: usize = 5;

/// Tag added to high and critical results
pub const MALICIOUS_TAG: &str = "malicious";
