/*!
 * Provider implementations for the model service.
 *
 * This module contains the clients the translator can talk to:
 * - Ollama: Local LLM server, reached over its chat API
 * - Mock: Scriptable in-process provider used by the tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// One chat completion: a system instruction plus the user text
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier as the service knows it
    pub model: String,
    /// System instruction
    pub system: String,
    /// Text to translate
    pub user: String,
    /// Sampling temperature
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: system.into(),
            user: user.into(),
            temperature: 0.2,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Common trait for all LLM providers
///
/// A provider sends exactly one request per call. Retrying is the caller's
/// business, so implementations must not retry on their own.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request and return the raw assistant text
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The model output or a classified error
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError>;

    /// Test the connection to the provider
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the service answered
    async fn test_connection(&self) -> Result<(), ProviderError>;
}

pub mod mock;
pub mod ollama;
