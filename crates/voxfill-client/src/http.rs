//! Shared request plumbing for the provider clients.
//!
//! Requests are made once. A failed download is recorded against its record
//! and left to the user to retry, so there is no backoff loop here.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use voxfill_core::config::HttpConfig;
use voxfill_core::error::AppError;

pub(crate) fn build_client(config: &HttpConfig) -> Result<Client, AppError> {
    Client::builder()
        .user_agent(config.user_agent)
        .timeout(config.timeout)
        .build()
        .map_err(|e| AppError::ClientError(e.to_string()))
}

/// GET `url` and classify anything but a 2xx response.
pub(crate) async fn get(
    client: &Client,
    url: &Url,
    timeout: Duration,
) -> Result<Response, AppError> {
    tracing::debug!(url = %url, "GET");
    let resp = client.get(url.clone()).send().await.map_err(|e| {
        if e.is_timeout() {
            AppError::Timeout(timeout.as_secs())
        } else if e.is_connect() {
            AppError::NetworkError(format!("Connection failed: {}", e))
        } else {
            AppError::ClientError(e.to_string())
        }
    })?;

    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(url = %url, "Provider is rate limiting requests");
    }
    Err(AppError::ClientError(format!(
        "HTTP {} from {}",
        status.as_u16(),
        url.host_str().unwrap_or_default()
    )))
}

/// GET `url` and return the whole body.
pub(crate) async fn download(
    client: &Client,
    url: &Url,
    timeout: Duration,
) -> Result<Vec<u8>, AppError> {
    let resp = get(client, url, timeout).await?;
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| AppError::NetworkError(e.to_string()))?;
    Ok(bytes.to_vec())
}

/// Name of a temp download for `query` in `locale`.
///
/// Characters that cannot appear in file names on common platforms are
/// replaced with `_`.
pub(crate) fn temp_file_name(locale: &str, query: &str) -> String {
    let safe: String = query
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("pronunciation_{}_{}.mp3", locale, safe)
}
