//! Configuration module
//!
//! Process-wide configuration, built once at startup from the environment and passed
//! explicitly to the pipeline stages. Nothing here is mutated after `Config::from_env`.

use std::env;

const DEFAULT_PORT: u16 = 8080;
const HTTP_CONCURRENCY_LIMIT: usize = 1024;
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_TIMEOUT_SECS: u64 = 300;
const GEMINI_THINKING_BUDGET: i32 = -1;
const MAX_INLINE_UPLOAD_MB: usize = 20;
const MAX_REMOTE_FILE_MB: usize = 512;
const REMOTE_SPOOL_THRESHOLD_MB: usize = 16;
const URL_FETCH_TIMEOUT_SECS: u64 = 60;

/// Server-level settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub http_concurrency_limit: usize,
}

/// Settings for the hosted generative model
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model_id: String,
    pub api_base: String,
    pub use_thinking: bool,
    /// Budget sent when thinking is enabled. -1 lets the model decide.
    pub thinking_budget: i32,
    pub timeout_secs: u64,
}

// Hand-written so the credential never ends up in logs.
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model_id", &self.model_id)
            .field("api_base", &self.api_base)
            .field("use_thinking", &self.use_thinking)
            .field("thinking_budget", &self.thinking_budget)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Limits applied while acquiring media
#[derive(Clone, Debug)]
pub struct IntakeConfig {
    /// Uploads above this size must be supplied through `publicUrl` instead.
    pub max_inline_upload_bytes: usize,
    pub max_remote_file_bytes: usize,
    /// Remote payloads above this size are spooled to a temporary file.
    pub remote_spool_threshold_bytes: usize,
    pub url_fetch_timeout_secs: u64,
    // If set, only URLs from these domains are fetched.
    pub url_fetch_allowlist: Option<Vec<String>>,
    pub url_fetch_allow_private: bool,
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub base: BaseConfig,
    pub gemini: GeminiConfig,
    pub intake: IntakeConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ServiceConfig>);

impl From<ServiceConfig> for Config {
    fn from(config: ServiceConfig) -> Self {
        Config(Box::new(config))
    }
}

impl Config {
    fn inner(&self) -> &ServiceConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn is_production(&self) -> bool {
        is_production_name(&self.inner().base.environment)
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.inner().base.http_concurrency_limit
    }

    pub fn gemini(&self) -> &GeminiConfig {
        &self.inner().gemini
    }

    pub fn model_id(&self) -> &str {
        &self.inner().gemini.model_id
    }

    pub fn intake(&self) -> &IntakeConfig {
        &self.inner().intake
    }

    pub fn max_inline_upload_bytes(&self) -> usize {
        self.inner().intake.max_inline_upload_bytes
    }

    pub fn max_remote_file_bytes(&self) -> usize {
        self.inner().intake.max_remote_file_bytes
    }

    pub fn url_fetch_allowlist(&self) -> Option<&[String]> {
        self.inner().intake.url_fetch_allowlist.as_deref()
    }

    /// Largest multipart body the server accepts: two inline files plus form fields.
    pub fn max_request_body_bytes(&self) -> usize {
        self.max_inline_upload_bytes()
            .saturating_mul(2)
            .saturating_add(1024 * 1024)
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

/// Interpret the thinking switch: `true` or `yes`, trimmed and case-insensitive.
/// Anything else, including an absent value, disables it.
pub fn parse_thinking_flag(raw: Option<&str>) -> bool {
    raw.map(|v| v.trim().to_lowercase())
        .map(|v| v == "true" || v == "yes")
        .unwrap_or(false)
}

fn megabytes_from_env(name: &str, default_mb: usize) -> usize {
    parse_megabytes(env::var(name).ok().as_deref(), default_mb)
}

/// Megabyte count to bytes. Unparsable values fall back to the default; huge ones saturate.
fn parse_megabytes(raw: Option<&str>, default_mb: usize) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default_mb)
        .saturating_mul(1024 * 1024)
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(HTTP_CONCURRENCY_LIMIT)
                .max(1),
        };

        let gemini = GeminiConfig {
            api_key: env::var("GEMINI_API_KEY")
                .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY must be set"))?,
            model_id: env::var("GEMINI_MODEL_ID")
                .map_err(|_| anyhow::anyhow!("GEMINI_MODEL_ID must be set"))?,
            api_base: env::var("GEMINI_API_BASE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| GEMINI_API_BASE.to_string()),
            use_thinking: parse_thinking_flag(env::var("GEMINI_USE_THINKING").ok().as_deref()),
            thinking_budget: env::var("GEMINI_THINKING_BUDGET")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(GEMINI_THINKING_BUDGET),
            timeout_secs: env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(GEMINI_TIMEOUT_SECS),
        };

        let intake = IntakeConfig {
            max_inline_upload_bytes: megabytes_from_env(
                "MAX_INLINE_UPLOAD_MB",
                MAX_INLINE_UPLOAD_MB,
            ),
            max_remote_file_bytes: megabytes_from_env("MAX_REMOTE_FILE_MB", MAX_REMOTE_FILE_MB),
            remote_spool_threshold_bytes: megabytes_from_env(
                "REMOTE_SPOOL_THRESHOLD_MB",
                REMOTE_SPOOL_THRESHOLD_MB,
            ),
            url_fetch_timeout_secs: env::var("URL_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(URL_FETCH_TIMEOUT_SECS),
            url_fetch_allowlist: env::var("URL_FETCH_ALLOWLIST").ok().map(|s| {
                s.split(',')
                    .map(|domain| domain.trim().to_lowercase())
                    .filter(|domain| !domain.is_empty())
                    .collect()
            }),
            url_fetch_allow_private: env::var("URL_FETCH_ALLOW_PRIVATE")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
        };

        let config = ServiceConfig {
            base,
            gemini,
            intake,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(anyhow::anyhow!("GEMINI_API_KEY must not be empty"));
        }

        if self.gemini.model_id.trim().is_empty() {
            return Err(anyhow::anyhow!("GEMINI_MODEL_ID must not be empty"));
        }

        if !self.gemini.api_base.starts_with("http://")
            && !self.gemini.api_base.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "GEMINI_API_BASE must be an http:// or https:// URL"
            ));
        }

        if self.intake.max_inline_upload_bytes == 0 || self.intake.max_remote_file_bytes == 0 {
            return Err(anyhow::anyhow!("Upload size limits must be greater than zero"));
        }

        if self.intake.remote_spool_threshold_bytes > self.intake.max_remote_file_bytes {
            return Err(anyhow::anyhow!(
                "REMOTE_SPOOL_THRESHOLD_MB cannot exceed MAX_REMOTE_FILE_MB"
            ));
        }

        Ok(())
    }
}
