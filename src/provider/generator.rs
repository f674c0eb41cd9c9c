//! Core `StoryProvider` trait and error type.

use async_trait::async_trait;
use thiserror::Error;

use crate::story::ImageRef;

// ---------------------------------------------------------------------------
// ProviderError
// ---------------------------------------------------------------------------

/// Errors that can occur while generating story text or illustrations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No API key in the config or the `API_KEY` environment variable.
    #[error("API key is not configured")]
    MissingApiKey,

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request did not complete within the configured timeout.
    #[error("provider request timed out")]
    Timeout,

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse provider response: {0}")]
    Parse(String),

    /// The provider returned no usable text or image data.
    #[error("provider returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// StoryProvider trait
// ---------------------------------------------------------------------------

/// Async trait for generative story text and illustrations.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn StoryProvider>` between the studio and the orchestrator's
/// per-line image fetches.  Concurrent `generate_image` calls may resolve in
/// any order.
#[async_trait]
pub trait StoryProvider: Send + Sync {
    /// Generate story text for `prompt`.  The result is trimmed and non-empty.
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Generate an illustration for `prompt`.
    async fn generate_image(&self, prompt: &str) -> Result<ImageRef, ProviderError>;
}

// ---------------------------------------------------------------------------
// ScriptedProvider  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use scripted::ScriptedProvider;


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
