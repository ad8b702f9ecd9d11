use std::env;
use std::time::Duration;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::Client;
use tracing::{debug, warn};

use super::records::extract_candidates;
use super::types::{ApiError, Candidate, VolumesResponse};

const API_BASE: &str = "https://www.googleapis.com/books/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Everything beyond unreserved characters, so multilingual queries survive
/// the trip into the `q` parameter.
const QUERY_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'&')
    .add(b'+')
    .add(b'?')
    .add(b'%')
    .add(b'/');

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("BOOKS_API_KEY not set")]
    ApiKeyNotSet,

    #[error("catalog rate limit exceeded")]
    RateLimited,

    #[error("catalog error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// One text search against the remote catalog. No retries live here; the
/// orchestrator's fallback tiers are the recovery mechanism.
pub trait CatalogSearch {
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Candidate>, CatalogError>;
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    api_key: ApiKey,
    base_url: String,
}

impl CatalogClient {
    pub fn from_env(http: Client) -> Result<Self, CatalogError> {
        let api_key = env::var("BOOKS_API_KEY").map_err(|_| CatalogError::ApiKeyNotSet)?;
        if api_key.trim().is_empty() {
            return Err(CatalogError::ApiKeyNotSet);
        }
        let base_url = env::var("BOOKS_API_BASE")
            .ok()
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| API_BASE.to_string());
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            base_url,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            base_url: base_url.to_string(),
        }
    }
}

impl CatalogSearch for CatalogClient {
    async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Candidate>, CatalogError> {
        let start_index = page.saturating_sub(1).saturating_mul(page_size);
        let url = format!(
            "{}/volumes?q={}&startIndex={}&maxResults={}",
            self.base_url,
            utf8_percent_encode(query, QUERY_ENCODE),
            start_index,
            page_size,
        );

        let response = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.0.as_str())])
            .header("User-Agent", crate::USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("catalog rate limited");
            return Err(CatalogError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<VolumesResponse>(&text)
                && let Some(err) = &body.error
            {
                let classified = classify_api_error(err);
                warn!(error = %classified, "catalog error");
                return Err(classified);
            }
            let snippet = if text.len() > 200 { &text[..200] } else { &text };
            warn!(status = %status, "catalog error (no structured body)");
            return Err(CatalogError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {snippet}"),
            });
        }

        let body: VolumesResponse = response.json().await?;
        if let Some(err) = &body.error {
            let classified = classify_api_error(err);
            warn!(error = %classified, "catalog error in 200 response");
            return Err(classified);
        }

        let candidates = extract_candidates(&body);
        debug!(query, count = candidates.len(), "catalog search complete");
        Ok(candidates)
    }
}

fn classify_api_error(err: &ApiError) -> CatalogError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match err.code {
        Some(429) => CatalogError::RateLimited,
        Some(code) => CatalogError::Api { code, message },
        None => CatalogError::Api {
            code: 0,
            message: format!("Unknown error (no status code): {message}"),
        },
    }
}
