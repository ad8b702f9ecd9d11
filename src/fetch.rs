use reqwest::Client;
use tracing::debug;

const MAX_IMAGE_BYTES: usize = 8_000_000;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid URL: must be HTTP(S)")]
    InvalidScheme,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("fetch failed: status {0}")]
    Status(u16),

    #[error("response too large (>{} bytes)", MAX_IMAGE_BYTES)]
    TooLarge,
}

/// Downloads an image with a hard size cap. The shared client's timeouts
/// bound the call; a timeout surfaces as an ordinary `Http` failure.
pub async fn download_image(client: &Client, url: &str) -> Result<Vec<u8>, FetchError> {
    validate_url(url)?;

    let response = client
        .get(url)
        .header("User-Agent", crate::USER_AGENT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    if let Some(len) = response.content_length()
        && len as usize > MAX_IMAGE_BYTES
    {
        return Err(FetchError::TooLarge);
    }

    let mut body = Vec::new();
    let mut stream = response;
    while let Some(chunk) = stream.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() > MAX_IMAGE_BYTES {
            return Err(FetchError::TooLarge);
        }
    }

    debug!(url, bytes = body.len(), "image fetched");
    Ok(body)
}

fn validate_url(raw: &str) -> Result<(), FetchError> {
    let parsed = url::Url::parse(raw)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        _ => Err(FetchError::InvalidScheme),
    }
}
