//! Client configuration

/// Configuration for connecting to the order API and the venue hub gateway
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST base URL (e.g., "http://localhost:8080")
    pub base_url: String,

    /// Gateway WebSocket URL (e.g., "ws://localhost:8080/ws")
    pub gateway_url: String,

    /// Branch identifier announced in the controller hello
    pub branch_id: String,

    /// Bearer token for the REST API
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let gateway_url = default_gateway_url(&base_url);
        Self {
            base_url,
            gateway_url,
            branch_id: String::new(),
            token: None,
            timeout_secs: 10,
        }
    }

    /// Set the gateway WebSocket URL
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    /// Set the branch identifier
    pub fn with_branch_id(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = branch_id.into();
        self
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    /// Create an HTTP client from this configuration
    pub fn build_http_client(&self) -> super::HttpClient {
        super::HttpClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

/// Derive a `/ws` gateway URL from an HTTP base URL
fn default_gateway_url(base_url: &str) -> String {
    let swapped = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    };
    let trimmed = swapped.trim_end_matches('/');
    if trimmed.ends_with("/ws") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/ws")
    }
}
