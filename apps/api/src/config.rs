use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub telephony_api_url: String,
    pub telephony_api_key: String,
    /// Shared secret the telephony provider echoes back in `X-Webhook-Secret`.
    pub webhook_secret: String,
    /// Public base URL of this service, used to build the webhook callback URL.
    pub public_base_url: String,
    /// Maximum automated call retries per interview attempt.
    pub max_call_retries: i32,
    /// Forward delay before an interview call (and between retries), in seconds.
    pub call_delay_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            telephony_api_url: require_env("TELEPHONY_API_URL")?,
            telephony_api_key: require_env("TELEPHONY_API_KEY")?,
            webhook_secret: require_env("WEBHOOK_SECRET")?,
            public_base_url: require_env("PUBLIC_BASE_URL")?,
            max_call_retries: std::env::var("MAX_CALL_RETRIES")
                .unwrap_or_else(|_| "1".to_string())
                .parse::<i32>()
                .context("MAX_CALL_RETRIES must be a non-negative integer")?,
            call_delay_secs: std::env::var("CALL_DELAY_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse::<u64>()
                .context("CALL_DELAY_SECS must be a number of seconds")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
