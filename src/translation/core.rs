/*!
 * Core translation service implementation.
 *
 * This module contains the TranslationService struct, which turns one piece
 * of (already masked) subtitle text into the target language by asking the
 * model service, retrying transient failures under a bounded policy.
 */

use anyhow::Result;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::errors::TranslationError;
use crate::providers::ollama::Ollama;
use crate::providers::{CompletionRequest, Provider};
use super::placeholders::{ProtectedText, DEFAULT_PREFIX};
use super::prompts::{build_system_prompt, TranslationStyle};
use super::retry::{RetryPolicy, Sleeper, TokioSleeper};

/// Default sampling temperature; low keeps translations literal
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Per-job translation settings
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOptions {
    /// Target language code (`sv`, `de`, `zh-CN`)
    pub target_language: String,

    /// Tone directive
    pub style: TranslationStyle,

    /// Model identifier
    pub model: String,

    /// Replaces the generated system instruction when set
    pub system_prompt_override: Option<String>,
}

impl TranslationOptions {
    pub fn new(target_language: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            target_language: target_language.into(),
            style: TranslationStyle::default(),
            model: model.into(),
            system_prompt_override: None,
        }
    }

    pub fn with_style(mut self, style: TranslationStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt_override = Some(prompt.into());
        self
    }

    /// Options taken from the effective configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_language: config.target_language.clone(),
            style: config.style,
            model: config.model.clone(),
            system_prompt_override: config.system_prompt_override.clone(),
        }
    }

    /// The system instruction sent with every request of this job
    pub fn system_prompt(&self) -> String {
        self.system_prompt_for(DEFAULT_PREFIX)
    }

    /// The system instruction for text whose placeholders use `prefix`
    pub fn system_prompt_for(&self, prefix: &str) -> String {
        build_system_prompt(&self.target_language, self.style, self.system_prompt_override.as_deref(), prefix)
    }
}

/// Tidy a model answer: unify line endings and drop surrounding whitespace
fn clean_response(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}

/// Main translation service for subtitle translation
#[derive(Debug, Clone)]
pub struct TranslationService {
    /// Model service client
    provider: Arc<dyn Provider>,

    /// How often and how patiently to retry
    retry: RetryPolicy,

    /// Waits between attempts
    sleeper: Arc<dyn Sleeper>,

    /// Sampling temperature sent with every request
    temperature: f32,
}

impl TranslationService {
    /// Create a service over any provider
    pub fn new(provider: Arc<dyn Provider>, retry: RetryPolicy) -> Self {
        Self {
            provider,
            retry,
            sleeper: Arc::new(TokioSleeper),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Create a service talking to the Ollama endpoint named in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Ollama::new_with_config(&config.endpoint, Duration::from_secs(config.timeout_secs))?;
        Ok(Self::new(Arc::new(client), config.retry.clone()).with_temperature(config.temperature))
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Test the connection to the model service
    pub async fn test_connection(&self) -> Result<(), TranslationError> {
        self.provider
            .test_connection()
            .await
            .map_err(TranslationError::ServiceUnavailable)
    }

    /// Translate one block of text.
    ///
    /// Retryable errors (connection, timeout, 5xx) are retried up to the
    /// policy's attempt limit with backoff in between; anything else fails on
    /// the spot. An empty answer, or one identical to the input, is accepted.
    pub async fn translate(&self, block: usize, text: &str, options: &TranslationOptions) -> Result<String, TranslationError> {
        self.request(block, text, options.system_prompt(), options).await
    }

    /// Translate masked text, telling the model which placeholder tokens it carries
    pub async fn translate_masked(&self, block: usize, protected: &ProtectedText, options: &TranslationOptions) -> Result<String, TranslationError> {
        let system = options.system_prompt_for(protected.map.prefix());
        self.request(block, &protected.masked, system, options).await
    }

    async fn request(&self, block: usize, text: &str, system: String, options: &TranslationOptions) -> Result<String, TranslationError> {
        let request = CompletionRequest::new(&options.model, system, text)
            .with_temperature(self.temperature);

        let attempts = self.retry.attempts();
        let mut attempt = 1;
        loop {
            match self.provider.complete(request.clone()).await {
                Ok(answer) => {
                    let answer = clean_response(&answer);
                    if answer == text.trim() {
                        debug!("Block {}: model returned the source text unchanged", block);
                    }
                    return Ok(answer);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        "Block {}: attempt {}/{} failed ({}), retrying in {:.1}s",
                        block,
                        attempt,
                        attempts,
                        e,
                        delay.as_secs_f32()
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!("Block {}: giving up after {} attempt(s): {}", block, attempt, e);
                    return Err(TranslationError::TranslationFailed { block, attempts: attempt, source: e });
                }
            }
        }
    }
}
