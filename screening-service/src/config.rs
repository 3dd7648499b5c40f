//! Service configuration.
//!
//! Everything here is resolved once at process startup and passed into the
//! router state. Request handling never reads environment variables.

use std::fmt;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_SCAN_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_RISK_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_KNOWLEDGE_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_PORT: u16 = 3000;
/// Keeps the base64 inline image under the provider's 20 MB request limit
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 14 * 1024 * 1024;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Model identifiers used for each kind of request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSet {
    /// Image-capable model for scan analysis
    pub scan: String,
    /// Text model for risk assessment
    pub risk: String,
    /// Search-grounded model for knowledge queries
    pub knowledge: String,
}

impl Default for ModelSet {
    fn default() -> Self {
        Self {
            scan: DEFAULT_SCAN_MODEL.to_string(),
            risk: DEFAULT_RISK_MODEL.to_string(),
            knowledge: DEFAULT_KNOWLEDGE_MODEL.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ServiceConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub models: ModelSet,
    pub port: u16,
    pub max_upload_bytes: usize,
    /// Sessions without browser activity for this long are evicted
    pub session_idle_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            models: ModelSet::default(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_idle_timeout: Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let api_key = non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY"));

        let port = match non_empty("PORT") {
            Some(raw) => raw.parse::<u16>().unwrap_or_else(|_| {
                warn!("Invalid PORT value {:?}, using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let max_upload_bytes = match non_empty("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.parse::<usize>().unwrap_or_else(|_| {
                warn!(
                    "Invalid MAX_UPLOAD_BYTES value {:?}, using {}",
                    raw, DEFAULT_MAX_UPLOAD_BYTES
                );
                DEFAULT_MAX_UPLOAD_BYTES
            }),
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let session_idle_secs = match non_empty("SESSION_IDLE_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    warn!(
                        "Invalid SESSION_IDLE_SECS value {:?}, using {}",
                        raw, DEFAULT_SESSION_IDLE_SECS
                    );
                    DEFAULT_SESSION_IDLE_SECS
                }
            },
            None => DEFAULT_SESSION_IDLE_SECS,
        };

        Self {
            api_key,
            base_url: non_empty("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            models: ModelSet {
                scan: non_empty("SCAN_MODEL").unwrap_or(defaults.models.scan),
                risk: non_empty("RISK_MODEL").unwrap_or(defaults.models.risk),
                knowledge: non_empty("KNOWLEDGE_MODEL").unwrap_or(defaults.models.knowledge),
            },
            port,
            max_upload_bytes,
            session_idle_timeout: Duration::from_secs(session_idle_secs),
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("models", &self.models)
            .field("port", &self.port)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("session_idle_timeout", &self.session_idle_timeout)
            .finish()
    }
}
