//! Shared HTTP plumbing for the hosted providers.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::Response;

use crate::error::{ProviderError, ProviderResult};

/// Per-request timeout for embedding calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the reqwest client used by every provider.
pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Map a send failure (DNS, connect, timeout, reset) to a retryable error.
pub fn send_error(provider: &str, err: &reqwest::Error) -> ProviderError {
    ProviderError::Transient {
        provider: provider.to_string(),
        message: err.to_string(),
    }
}

/// Parse a `Retry-After` header given in seconds.
#[must_use]
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value?.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Pass successful responses through; classify everything else.
pub async fn check_status(provider: &str, response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = parse_retry_after(
        response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok()),
    );
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::from_status(
        provider,
        status.as_u16(),
        retry_after,
        body,
    ))
}

/// Decode a JSON body, mapping decode failures to `MalformedResponse`.
pub async fn decode<T: serde::de::DeserializeOwned>(
    provider: &str,
    response: Response,
) -> ProviderResult<T> {
    response
        .json()
        .await
        .map_err(|e| ProviderError::MalformedResponse {
            provider: provider.to_string(),
            message: e.to_string(),
        })
}

/// Shorthand for a malformed-response error.
pub fn malformed(provider: &str, message: &str) -> ProviderError {
    ProviderError::MalformedResponse {
        provider: provider.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(Some("7")), Some(Duration::from_secs(7)));
        assert_eq!(parse_retry_after(Some(" 2 ")), Some(Duration::from_secs(2)));
        assert_eq!(parse_retry_after(Some("Wed, 21 Oct 2015 07:28:00 GMT")), None);
        assert_eq!(parse_retry_after(None), None);
    }
}
