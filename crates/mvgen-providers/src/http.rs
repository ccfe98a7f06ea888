//! Shared HTTP helpers for provider adapters.

use std::time::Duration;

use reqwest::{Client, Response};

use crate::error::{ProviderError, ProviderResult};

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 512;

/// Turn a non-2xx response into a [`ProviderError`].
pub(crate) async fn ensure_success(response: Response) -> ProviderResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let cut = (0..=MAX_ERROR_BODY)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        body.truncate(cut);
    }
    Err(ProviderError::from_http_status(status, body))
}

/// Download a URL fully into memory.
pub(crate) async fn fetch_bytes(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> ProviderResult<Vec<u8>> {
    let response = client.get(url).timeout(timeout).send().await?;
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Err(ProviderError::empty_result(format!("{} returned no data", url)));
    }
    Ok(bytes.to_vec())
}

/// The API key, or `NotConfigured` naming the missing variable.
pub(crate) fn require_key<'a>(key: &'a Option<String>, var: &str) -> ProviderResult<&'a str> {
    key.as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ProviderError::not_configured(format!("{} not set", var)))
}

/// Read an environment variable, falling back to `default`.
pub(crate) fn env_or(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Read an optional non-empty environment variable.
pub(crate) fn env_opt(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}
