//! Configuration module for the Callgate server
//!
//! All configuration comes from environment variables (with `.env` loaded in
//! `main` before this runs). Provider credentials are optional at startup:
//! the server boots without them and the affected endpoint reports a
//! configuration error instead, so a partial deployment stays diagnosable.

use std::path::PathBuf;

/// TLS configuration for HTTPS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Credentials and identifiers for the access-code record store.
#[derive(Debug, Clone)]
pub struct AirtableCredentials {
    pub api_key: String,
    pub base_id: String,
    /// Table id or name, e.g. `Access_Codes` or `tblFUNGrX9M2n7Ies`.
    pub table: String,
}

/// Server configuration
///
/// Contains everything needed to run the Callgate server:
/// - Server settings (host, port, TLS)
/// - Record store credentials (Airtable)
/// - Voice provider API key (Retell)
/// - Security settings (CORS, rate limiting)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Record store (Airtable) settings
    pub airtable_api_key: Option<String>,
    pub airtable_base_id: Option<String>,
    /// Accepts either `AIRTABLE_TABLE_ID_OR_NAME` or `AIRTABLE_TABLE_ID`.
    pub airtable_table_id: Option<String>,

    // Voice provider (Retell) settings
    pub retell_api_key: Option<String>,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,
}

/// Zeroize all secret fields when ServerConfig is dropped so credentials do
/// not linger in freed memory.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.airtable_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.retell_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or blank variables fall back to defaults; a present-but-invalid
    /// value (e.g. an unparseable port) is an error rather than a silent
    /// default.
    pub fn from_env() -> Result<Self, String> {
        let tls = match (env_opt("TLS_CERT_PATH"), env_opt("TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => {
                return Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string());
            }
        };

        Ok(Self {
            host: env_opt("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env_parse("PORT", 8080)?,
            tls,
            airtable_api_key: env_opt("AIRTABLE_API_KEY"),
            airtable_base_id: env_opt("AIRTABLE_BASE_ID"),
            airtable_table_id: env_opt("AIRTABLE_TABLE_ID_OR_NAME")
                .or_else(|| env_opt("AIRTABLE_TABLE_ID")),
            retell_api_key: env_opt("RETELL_API_KEY"),
            cors_allowed_origins: env_opt("CORS_ALLOWED_ORIGINS"),
            rate_limit_requests_per_second: env_parse("RATE_LIMIT_REQUESTS_PER_SECOND", 60)?,
            rate_limit_burst_size: env_parse("RATE_LIMIT_BURST_SIZE", 10)?,
        })
    }

    /// Get the server address as a string in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Record store credentials, when the deployment provides all three
    /// values.
    pub fn airtable_credentials(&self) -> Option<AirtableCredentials> {
        Some(AirtableCredentials {
            api_key: self.airtable_api_key.clone()?,
            base_id: self.airtable_base_id.clone()?,
            table: self.airtable_table_id.clone()?,
        })
    }

    /// Voice provider API key, when configured.
    pub fn retell_api_key(&self) -> Option<&str> {
        self.retell_api_key.as_deref()
    }
}

/// Read an environment variable, treating blank values as unset.
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env_opt(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("invalid value for {name}: {raw}")),
        None => Ok(default),
    }
}
