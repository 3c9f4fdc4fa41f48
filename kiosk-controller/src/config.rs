//! Controller configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | API_BASE_URL | http://localhost:8080 | Order/position REST base URL |
//! | GATEWAY_URL | derived from API_BASE_URL | Hub WebSocket URL |
//! | BRANCH_ID | (empty) | Branch announced in the controller hello |
//! | API_TOKEN | (none) | Bearer token for the REST API |
//! | POLL_INTERVAL_MS | 3000 | Robot position poll interval |
//! | HTTP_TIMEOUT_SECS | 10 | REST request timeout |
//! | REFRESH_DEBOUNCE_MS | 3000 | Payment-refresh debounce window |
//! | LOG_DIR | (none) | Directory for daily-rolling file logs |
//! | ENVIRONMENT | development | development \| staging \| production |

use kiosk_client::ClientConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub gateway_url: Option<String>,
    pub branch_id: String,
    pub api_token: Option<String>,
    pub poll_interval_ms: u64,
    pub http_timeout_secs: u64,
    pub refresh_debounce_ms: u64,
    pub log_dir: Option<String>,
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables, with defaults
    pub fn from_env() -> Self {
        Self {
            api_base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            gateway_url: std::env::var("GATEWAY_URL").ok(),
            branch_id: std::env::var("BRANCH_ID").unwrap_or_default(),
            api_token: std::env::var("API_TOKEN").ok(),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            refresh_debounce_ms: std::env::var("REFRESH_DEBOUNCE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            log_dir: std::env::var("LOG_DIR").ok(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Build the network client configuration
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.api_base_url)
            .with_branch_id(&self.branch_id)
            .with_timeout(self.http_timeout_secs);
        if let Some(url) = &self.gateway_url {
            config = config.with_gateway_url(url);
        }
        if let Some(token) = &self.api_token {
            config = config.with_token(token);
        }
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
