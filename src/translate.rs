use std::env;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("TRANSLATE_API_URL not set")]
    EndpointNotSet,

    #[error("translation failed: status {0}")]
    Status(u16),

    #[error("translation returned empty text")]
    Empty,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Best-effort text-to-text translation. Implementations are expected to be
/// unreliable; callers must treat every failure as skippable.
pub trait Translator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslateError>;
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
}

/// Client for a LibreTranslate-style `POST /translate` endpoint.
#[derive(Clone)]
pub struct HttpTranslator {
    http: Client,
    endpoint: String,
}

impl HttpTranslator {
    pub fn from_env(http: Client) -> Result<Self, TranslateError> {
        let endpoint = env::var("TRANSLATE_API_URL")
            .ok()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or(TranslateError::EndpointNotSet)?;
        Ok(Self { http, endpoint })
    }

    #[cfg(test)]
    pub(crate) fn with_endpoint(http: Client, endpoint: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
        }
    }
}

impl Translator for HttpTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslateError> {
        let request = TranslateRequest {
            q: text,
            source: "auto",
            target: target_lang,
            format: "text",
        };

        let response = self
            .http
            .post(&self.endpoint)
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status(status.as_u16()));
        }

        let body: TranslateResponse = response.json().await?;
        let translated = body
            .translated_text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(TranslateError::Empty)?;
        Ok(translated)
    }
}
