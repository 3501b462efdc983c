//! Document generation providers.
//!
//! Defines the [`DocumentGenerator`] trait and concrete implementations:
//! - **[`DisabledGenerator`]**: always fails; used when generation is not configured.
//! - **[`GeminiGenerator`]**: calls the Gemini `generateContent` API.
//! - **[`OpenAIGenerator`]**: calls an OpenAI-compatible chat completions API.
//!
//! Use [`create_generator`] to build the provider named in the config.
//!
//! # Retry Strategy
//!
//! HTTP providers share one retry loop:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: 1s, 2s, 4s, ... (capped at 2^5)

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::prompt::build_prompt;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Turns a serialized snapshot into a document.
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Generate a README from `snapshot_json`.
    ///
    /// The input is already cut to the snapshot budget.
    ///
    /// # Errors
    ///
    /// [`Error::Generation`] with the upstream detail.
    async fn generate(&self, snapshot_json: &str) -> Result<String>;
}

// ============ Disabled ============

/// Used when `generation.provider = "disabled"`.
pub struct DisabledGenerator;

#[async_trait]
impl DocumentGenerator for DisabledGenerator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _snapshot_json: &str) -> Result<String> {
        Err(Error::generation("generation provider is disabled"))
    }
}

// ============ Gemini ============

pub struct GeminiGenerator {
    model: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl GeminiGenerator {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            model: config.model.trim_start_matches("models/").to_string(),
            api_key,
            base_url: base_url(config, GEMINI_BASE_URL),
            client: http_client(config)?,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl DocumentGenerator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, snapshot_json: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [
                { "role": "user", "parts": [ { "text": build_prompt(snapshot_json) } ] }
            ]
        });

        let response = post_with_retry(self.max_retries, || {
            self.client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
        })
        .await?;

        parse_gemini_response(&response)
    }
}

/// Concatenate the text parts of the first candidate.
fn parse_gemini_response(json: &Value) -> Result<String> {
    if let Some(reason) = json
        .pointer("/promptFeedback/blockReason")
        .and_then(Value::as_str)
    {
        return Err(Error::generation(format!("prompt blocked: {}", reason)));
    }

    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::generation("invalid Gemini response: missing candidate parts"))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(Error::generation("Gemini returned an empty document"));
    }
    Ok(text)
}

// ============ OpenAI-compatible ============

pub struct OpenAIGenerator {
    model: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: base_url(config, OPENAI_BASE_URL),
            client: http_client(config)?,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl DocumentGenerator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, snapshot_json: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": build_prompt(snapshot_json) }
            ]
        });

        let response = post_with_retry(self.max_retries, || {
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;

        parse_openai_response(&response)
    }
}

fn parse_openai_response(json: &Value) -> Result<String> {
    let text = json
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::generation("invalid OpenAI response: missing message content"))?;

    if text.trim().is_empty() {
        return Err(Error::generation("OpenAI returned an empty document"));
    }
    Ok(text.to_string())
}

// ============ Shared HTTP ============

fn base_url(config: &GenerationConfig, default: &str) -> String {
    config
        .base_url
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

fn http_client(config: &GenerationConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// Send the request built by `build` until it succeeds, fails permanently,
/// or `max_retries` extra attempts are used up.
async fn post_with_retry<F>(max_retries: u32, build: F) -> Result<Value>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            debug!("retrying generation in {:?} (attempt {})", delay, attempt + 1);
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response.json().await?);
                }

                let body_text = response.text().await.unwrap_or_default();
                let err = Error::generation(format!("API error {}: {}", status, body_text));

                // Rate limited or server error: retry
                if status.as_u16() == 429 || status.is_server_error() {
                    warn!("{}", err);
                    last_err = Some(err);
                    continue;
                }

                return Err(err);
            }
            Err(e) => {
                warn!("generation request failed: {}", e);
                last_err = Some(e.into());
            }
        }
    }

    Err(last_err.unwrap_or_else(|| Error::generation("generation failed after retries")))
}

/// Build the provider named by `config.provider`.
///
/// `api_key` overrides the key read from `config.api_key_env`.
///
/// # Errors
///
/// [`Error::Generation`] if an HTTP provider has no API key, or
/// [`Error::Config`] for an unknown provider.
pub fn create_generator(
    config: &GenerationConfig,
    api_key: Option<String>,
) -> Result<Box<dyn DocumentGenerator>> {
    if !config.is_enabled() {
        return Ok(Box::new(DisabledGenerator));
    }

    let api_key = api_key
        .filter(|k| !k.trim().is_empty())
        .or_else(|| std::env::var(&config.api_key_env).ok())
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            Error::generation(format!(
                "no API key: pass --api-key or set {}",
                config.api_key_env
            ))
        })?;

    let generator: Box<dyn DocumentGenerator> = match config.provider.as_str() {
        "gemini" => Box::new(GeminiGenerator::new(config, api_key)?),
        "openai" => Box::new(OpenAIGenerator::new(config, api_key)?),
        other => {
            return Err(Error::config(format!(
                "unknown generation provider: {}",
                other
            )))
        }
    };

    info!(
        "using {} provider, model {}",
        config.provider,
        generator.model_name()
    );
    Ok(generator)
}
