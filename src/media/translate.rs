use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Machine-translation adapter boundary. Backends are config-selected and
/// the pipeline does not care which one is behind the trait.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> ServiceResult<String>;
}

/// Remote client for a LibreTranslate-compatible endpoint.
pub struct LibreTranslateClient {
    client: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

impl LibreTranslateClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Translator for LibreTranslateClient {
    async fn translate(&self, text: &str, source: &str, target: &str) -> ServiceResult<String> {
        // Translation of empty text is empty text; no network round trip.
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        info!("translating {} chars {} -> {}", text.len(), source, target);

        let response = self
            .client
            .post(&self.url)
            .json(&TranslateRequest {
                q: text,
                source,
                target,
                format: "text",
            })
            .send()
            .await
            .map_err(|e| ServiceError::TranslationFailed(format!("request to {}: {e}", self.url)))?;

        if !response.status().is_success() {
            return Err(ServiceError::TranslationFailed(format!(
                "{} returned {}",
                self.url,
                response.status()
            )));
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::TranslationFailed(format!("malformed response: {e}")))?;

        Ok(body.translated_text)
    }
}

/// Returns the input unchanged. Used when no translation endpoint is
/// reachable (offline deployments) so the pipeline shape stays identical.
pub struct PassthroughTranslator;

#[async_trait]
impl Translator for PassthroughTranslator {
    async fn translate(&self, text: &str, _source: &str, _target: &str) -> ServiceResult<String> {
        Ok(text.to_string())
    }
}
