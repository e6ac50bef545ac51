//! HTTP client construction for OpenAI-compatible services.

use crate::error::{RapportError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for API requests (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create a reqwest client with the given request timeout.
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RapportError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Create an OpenAI-compatible client against `api_base`.
///
/// Works for any provider exposing the OpenAI wire format (OpenAI, Mistral, local servers).
pub fn create_client(
    api_base: &str,
    api_key: &str,
    timeout: Duration,
) -> Result<Client<OpenAIConfig>> {
    let http_client = create_http_client(timeout)?;
    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// Read an API key from the named environment variable.
pub fn api_key_from_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        Ok(_) => Err(RapportError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            var, var
        ))),
        Err(_) => Err(RapportError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}
