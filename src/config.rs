//! Configuration management for the stride server
//!
//! All configurable parameters in one place with environment variable overrides.
//! Follows the principle: sensible defaults, configurable in production.

use std::env;
use std::path::PathBuf;
use tracing::info;

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins (empty = allow all)
    pub allowed_origins: Vec<String>,
    /// Allowed HTTP methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Whether to allow credentials
    pub allow_credentials: bool,
    /// Max age for preflight cache (seconds)
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(), // Empty = allow all origins
            allowed_methods: vec![
                "GET".to_string(),
                "POST".to_string(),
                "PUT".to_string(),
                "DELETE".to_string(),
                "OPTIONS".to_string(),
            ],
            allowed_headers: vec![
                "Content-Type".to_string(),
                "Authorization".to_string(),
                "X-Request-ID".to_string(),
            ],
            allow_credentials: false,
            max_age_seconds: 86400, // 24 hours
        }
    }
}

impl CorsConfig {
    /// Load from environment variables with production safety checks
    ///
    /// In production mode (STRIDE_ENV=production), warns if CORS origins are
    /// not configured to prevent accidentally running with permissive CORS.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(origins) = env::var("STRIDE_CORS_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(methods) = env::var("STRIDE_CORS_METHODS") {
            config.allowed_methods = methods
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(headers) = env::var("STRIDE_CORS_HEADERS") {
            config.allowed_headers = headers
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Ok(val) = env::var("STRIDE_CORS_CREDENTIALS") {
            config.allow_credentials = val.to_lowercase() == "true" || val == "1";
        }

        if let Ok(val) = env::var("STRIDE_CORS_MAX_AGE") {
            if let Ok(n) = val.parse() {
                config.max_age_seconds = n;
            }
        }

        let is_production = env::var("STRIDE_ENV")
            .map(|v| {
                let v = v.to_lowercase();
                v == "production" || v == "prod"
            })
            .unwrap_or(false);

        if is_production && config.allowed_origins.is_empty() {
            tracing::warn!(
                "⚠️  PRODUCTION WARNING: CORS allows all origins. Set STRIDE_CORS_ORIGINS for security."
            );
        }

        config
    }

    /// Check if any origin restrictions are configured
    pub fn is_restricted(&self) -> bool {
        !self.allowed_origins.is_empty()
    }

    /// Convert to tower-http CorsLayer
    pub fn to_layer(&self) -> tower_http::cors::CorsLayer {
        use tower_http::cors::{AllowOrigin, Any, CorsLayer};

        let mut layer = CorsLayer::new();

        if self.allowed_origins.is_empty() {
            // Intentionally permissive - no origins configured
            layer = layer.allow_origin(Any);
        } else {
            let mut valid_origins = Vec::new();
            let mut invalid_origins = Vec::new();

            for origin_str in &self.allowed_origins {
                match origin_str.parse::<axum::http::HeaderValue>() {
                    Ok(origin) => valid_origins.push(origin),
                    Err(_) => invalid_origins.push(origin_str.clone()),
                }
            }

            for invalid in &invalid_origins {
                tracing::warn!("CORS: Invalid origin '{}' - skipping", invalid);
            }

            if valid_origins.is_empty() {
                // All configured origins failed to parse - this is a config error.
                // Do NOT fall back to permissive - that would be a security hole.
                tracing::error!(
                    "CORS: All {} configured origin(s) failed to parse. \
                     Rejecting all cross-origin requests. Fix STRIDE_CORS_ORIGINS.",
                    self.allowed_origins.len()
                );
                layer =
                    layer.allow_origin(AllowOrigin::list(Vec::<axum::http::HeaderValue>::new()));
            } else {
                if !invalid_origins.is_empty() {
                    tracing::info!(
                        "CORS: Using {} valid origin(s), {} invalid skipped",
                        valid_origins.len(),
                        invalid_origins.len()
                    );
                }
                layer = layer.allow_origin(AllowOrigin::list(valid_origins));
            }
        }

        let methods: Vec<axum::http::Method> = self
            .allowed_methods
            .iter()
            .filter_map(|m| m.parse().ok())
            .collect();
        if methods.is_empty() {
            layer = layer.allow_methods(Any);
        } else {
            layer = layer.allow_methods(methods);
        }

        let headers: Vec<axum::http::HeaderName> = self
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        if headers.is_empty() {
            layer = layer.allow_headers(Any);
        } else {
            layer = layer.allow_headers(headers);
        }

        if self.allow_credentials {
            layer = layer.allow_credentials(true);
        }

        layer.max_age(std::time::Duration::from_secs(self.max_age_seconds))
    }
}

/// Server configuration loaded from environment with defaults
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host address (default: 127.0.0.1)
    /// Set to 0.0.0.0 for Docker or network-accessible deployments
    pub host: String,

    /// Server port (default: 4040)
    pub port: u16,

    /// Storage path for RocksDB (default: ./stride_data)
    pub storage_path: PathBuf,

    /// JWT lifetime in hours (default: 72)
    pub token_ttl_hours: i64,

    /// Classifier API base URL (default: Google Generative Language endpoint)
    pub classifier_url: String,

    /// Classifier model name (default: gemini-2.0-flash)
    pub classifier_model: String,

    /// Classifier request timeout in seconds (default: 30)
    pub classifier_timeout_secs: u64,

    /// Rate limit: requests per second (default: 50)
    pub rate_limit_per_second: u64,

    /// Rate limit: burst size (default: 100)
    pub rate_limit_burst: u32,

    /// Maximum concurrent requests (default: 200)
    pub max_concurrent_requests: usize,

    /// Whether running in production mode
    pub is_production: bool,

    /// CORS configuration
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4040,
            storage_path: PathBuf::from("./stride_data"),
            token_ttl_hours: 72,
            classifier_url: "https://generativelanguage.googleapis.com".to_string(),
            classifier_model: "gemini-2.0-flash".to_string(),
            classifier_timeout_secs: 30,
            rate_limit_per_second: 50,
            rate_limit_burst: 100,
            max_concurrent_requests: 200,
            is_production: false,
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults
    #[allow(clippy::field_reassign_with_default)] // Environment overrides require mutable config
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Check production mode first
        config.is_production = env::var("STRIDE_ENV")
            .map(|v| {
                let v = v.to_lowercase();
                v == "production" || v == "prod"
            })
            .unwrap_or(false);

        // Host (bind address)
        if let Ok(val) = env::var("STRIDE_HOST") {
            config.host = val;
        }

        // Port
        if let Ok(val) = env::var("STRIDE_PORT") {
            if let Ok(port) = val.parse() {
                config.port = port;
            }
        }

        // Storage path
        if let Ok(val) = env::var("STRIDE_DATA_PATH") {
            config.storage_path = PathBuf::from(val);
        }

        // Token lifetime
        if let Ok(val) = env::var("STRIDE_TOKEN_TTL_HOURS") {
            if let Ok(n) = val.parse::<i64>() {
                config.token_ttl_hours = n.clamp(1, 24 * 365);
            }
        }

        // Classifier endpoint
        if let Ok(val) = env::var("STRIDE_CLASSIFIER_URL") {
            config.classifier_url = val.trim_end_matches('/').to_string();
        }

        if let Ok(val) = env::var("STRIDE_CLASSIFIER_MODEL") {
            config.classifier_model = val;
        }

        if let Ok(val) = env::var("STRIDE_CLASSIFIER_TIMEOUT") {
            if let Ok(n) = val.parse() {
                config.classifier_timeout_secs = n;
            }
        }

        // Rate limiting
        if let Ok(val) = env::var("STRIDE_RATE_LIMIT") {
            if let Ok(n) = val.parse() {
                config.rate_limit_per_second = n;
            }
        }

        if let Ok(val) = env::var("STRIDE_RATE_BURST") {
            if let Ok(n) = val.parse() {
                config.rate_limit_burst = n;
            }
        }

        // Concurrency
        if let Ok(val) = env::var("STRIDE_MAX_CONCURRENT") {
            if let Ok(n) = val.parse() {
                config.max_concurrent_requests = n;
            }
        }

        // CORS configuration
        config.cors = CorsConfig::from_env();

        config
    }

    /// Log the current configuration
    pub fn log(&self) {
        info!("📋 Configuration:");
        info!(
            "   Mode: {}",
            if self.is_production {
                "PRODUCTION"
            } else {
                "Development"
            }
        );
        info!("   Bind: {}:{}", self.host, self.port);
        info!("   Storage: {:?}", self.storage_path);
        info!("   Token TTL: {}h", self.token_ttl_hours);
        info!(
            "   Classifier: {} ({}s timeout)",
            self.classifier_model, self.classifier_timeout_secs
        );
        if self.rate_limit_per_second > 0 {
            info!(
                "   Rate limit: {} req/sec (burst: {})",
                self.rate_limit_per_second, self.rate_limit_burst
            );
        } else {
            info!("   Rate limit: disabled");
        }
        info!("   Max concurrent: {}", self.max_concurrent_requests);
        if self.cors.is_restricted() {
            info!("   CORS origins: {:?}", self.cors.allowed_origins);
        } else {
            info!("   CORS: Permissive (all origins allowed)");
        }
    }
}

/// Environment variable documentation
#[allow(unused)] // Public API - available for CLI help output
pub fn print_env_help() {
    println!("Stride Configuration Environment Variables:");
    println!();
    println!("  STRIDE_ENV               - Set to 'production' or 'prod' for production mode");
    println!("  STRIDE_HOST              - Bind address (default: 127.0.0.1, use 0.0.0.0 for Docker)");
    println!("  STRIDE_PORT              - Server port (default: 4040)");
    println!("  STRIDE_DATA_PATH         - Storage directory (default: ./stride_data)");
    println!("  STRIDE_JWT_SECRET        - HS256 signing secret (required in production)");
    println!("  STRIDE_TOKEN_TTL_HOURS   - Token lifetime in hours (default: 72)");
    println!("  STRIDE_RATE_LIMIT        - Requests per second (default: 50)");
    println!("  STRIDE_RATE_BURST        - Burst size (default: 100)");
    println!("  STRIDE_MAX_CONCURRENT    - Max concurrent requests (default: 200)");
    println!();
    println!("Classifier:");
    println!("  GEMINI_API_KEY           - API key for the language model");
    println!("  STRIDE_CLASSIFIER_URL    - API base URL (default: https://generativelanguage.googleapis.com)");
    println!("  STRIDE_CLASSIFIER_MODEL  - Model name (default: gemini-2.0-flash)");
    println!("  STRIDE_CLASSIFIER_TIMEOUT - Request timeout in seconds (default: 30)");
    println!();
    println!("CORS Configuration:");
    println!("  STRIDE_CORS_ORIGINS      - Comma-separated allowed origins (default: all)");
    println!("  STRIDE_CORS_METHODS      - Comma-separated allowed methods (default: GET,POST,PUT,DELETE,OPTIONS)");
    println!("  STRIDE_CORS_HEADERS      - Comma-separated allowed headers (default: Content-Type,Authorization,X-Request-ID)");
    println!("  STRIDE_CORS_CREDENTIALS  - Allow credentials true/false (default: false)");
    println!("  STRIDE_CORS_MAX_AGE      - Preflight cache seconds (default: 86400)");
    println!();
    println!("  RUST_LOG                 - Log level (e.g., info, debug, trace)");
    println!();
}
