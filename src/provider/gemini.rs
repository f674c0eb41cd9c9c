//! [`GeminiProvider`] — story text and illustrations from the Google
//! Generative Language REST API.
//!
//! * Text:   `POST {base_url}/v1beta/models/{text_model}:generateContent`
//! * Images: `POST {base_url}/v1beta/models/{image_model}:predict`
//!
//! All connection details come from [`ProviderConfig`]; the key is sent in
//! the `x-goog-api-key` header.

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::provider::generator::{ProviderError, StoryProvider};
use crate::story::ImageRef;

/// Generative Language API client.
pub struct GeminiProvider {
    client: reqwest::Client,
    config: ProviderConfig,
    api_key: Option<String>,
}

impl GeminiProvider {
    /// Build a provider from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`.  A missing API key is not an error here; every
    /// request then fails with [`ProviderError::MissingApiKey`].
    pub fn from_config(config: &ProviderConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let api_key = config.resolved_api_key();
        if api_key.is_none() {
            log::warn!("provider: no API key configured; generation will fail");
        }

        Self {
            client,
            config: config.clone(),
            api_key,
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))
    }
}

/// Request body for a `generateContent` call.
fn text_request(prompt: &str, config: &ProviderConfig) -> serde_json::Value {
    serde_json::json!({
        "contents": [
            { "parts": [ { "text": prompt } ] }
        ],
        "generationConfig": {
            "temperature": config.temperature,
            "topP":        config.top_p
        }
    })
}

/// Request body for an image `predict` call: one 16:9 JPEG.
fn image_request(prompt: &str) -> serde_json::Value {
    serde_json::json!({
        "instances": [ { "prompt": prompt } ],
        "parameters": {
            "sampleCount":    1,
            "aspectRatio":    "16:9",
            "outputMimeType": "image/jpeg"
        }
    })
}

/// Concatenated text parts of the first candidate, trimmed.
fn extract_text(json: &serde_json::Value) -> Result<String, ProviderError> {
    let parts = json["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or(ProviderError::EmptyResponse)?;

    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(text.to_string())
}

/// Base64 bytes of the first prediction as a JPEG data URL.
fn extract_image(json: &serde_json::Value) -> Result<ImageRef, ProviderError> {
    let bytes = json["predictions"][0]["bytesBase64Encoded"]
        .as_str()
        .filter(|b| !b.is_empty())
        .ok_or(ProviderError::EmptyResponse)?;
    Ok(ImageRef::jpeg_base64(bytes))
}

#[async_trait]
impl StoryProvider for GeminiProvider {
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = self.endpoint(&self.config.text_model, "generateContent");
        let json = self.post(&url, &text_request(prompt, &self.config)).await?;
        let text = extract_text(&json)?;
        log::debug!("provider: story text received ({} chars)", text.len());
        Ok(text)
    }

    async fn generate_image(&self, prompt: &str) -> Result<ImageRef, ProviderError> {
        let url = self.endpoint(&self.config.image_model, "predict");
        let json = self.post(&url, &image_request(prompt)).await?;
        extract_image(&json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
