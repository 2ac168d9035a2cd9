/*!
 * Mock provider implementations for testing.
 *
 * This module provides a mock provider that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds with a tagged copy of the input
 * - `MockProvider::failing(error)` - Always fails with the given error
 * - `MockProvider::empty()` - Answers with an empty string
 * - `MockProvider::dropping_placeholders()` - Answers without any placeholder tokens
 *
 * A script of canned results can be queued in front of any behavior, and a
 * custom responder can decide per request.
 */

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, Provider};

static TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<<[A-Z0-9]+_\d+>>").unwrap());

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with `[TRANSLATED] <input>`
    Working,
    /// Returns the input unchanged
    Echo,
    /// Always fails with the given error
    Failing(ProviderError),
    /// Returns an empty response
    Empty,
    /// Succeeds but strips every placeholder token from the input
    DroppingPlaceholders,
}

/// Per-request decision function
pub type Responder = fn(&CompletionRequest) -> Result<String, ProviderError>;

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Requests seen so far, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Canned results consumed before the behavior applies
    script: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    /// Custom response generator (optional)
    responder: Option<Responder>,
    /// Simulated latency per request
    delay: Option<Duration>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
            responder: None,
            delay: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that answers with the input text
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// Create a failing mock provider that always errors
    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that loses every placeholder token
    pub fn dropping_placeholders() -> Self {
        Self::new(MockBehavior::DroppingPlaceholders)
    }

    /// Queue canned results; each request consumes one until the script runs out
    pub fn with_script(self, results: Vec<Result<String, ProviderError>>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.extend(results);
        }
        self
    }

    /// Set a custom responder that overrides the behavior
    pub fn with_responder(mut self, responder: Responder) -> Self {
        self.responder = Some(responder);
        self
    }

    /// Wait this long before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Copy of every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|requests| requests.clone()).unwrap_or_default()
    }

    fn respond(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let scripted = self.script.lock().ok().and_then(|mut script| script.pop_front());
        if let Some(result) = scripted {
            return result;
        }

        if let Some(responder) = self.responder {
            return responder(request);
        }

        match &self.behavior {
            MockBehavior::Working => Ok(format!("[TRANSLATED] {}", request.user)),
            MockBehavior::Echo => Ok(request.user.clone()),
            MockBehavior::Failing(error) => Err(error.clone()),
            MockBehavior::Empty => Ok(String::new()),
            MockBehavior::DroppingPlaceholders => {
                Ok(format!("[TRANSLATED] {}", TOKEN_REGEX.replace_all(&request.user, "")))
            }
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.respond(&request)
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.behavior {
            MockBehavior::Failing(error) if error.is_unreachable() => Err(error.clone()),
            _ => Ok(()),
        }
    }
}
