//! Shared HTTP plumbing for the provider adapters.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;
use url::Url;

use newswire_types::NewswireError;

/// Thin wrapper over `reqwest::Client` carrying the per-source defaults:
/// fixed headers, a 30 s request timeout, and cancellation-aware sends.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    source: &'static str,
}

impl HttpClient {
    /// Build a client for `source` with its fixed headers and timeout.
    ///
    /// # Errors
    /// `InvalidArg` when a header name or value is malformed, or the
    /// underlying client cannot be constructed.
    pub fn new(
        source: &'static str,
        timeout: Duration,
        headers: &BTreeMap<String, String>,
    ) -> Result<Self, NewswireError> {
        let mut map = HeaderMap::new();
        for (k, v) in headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| NewswireError::InvalidArg(format!("bad header name {k:?}: {e}")))?;
            let value = HeaderValue::from_str(v)
                .map_err(|e| NewswireError::InvalidArg(format!("bad header value for {k}: {e}")))?;
            map.insert(name, value);
        }
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(map)
            .build()
            .map_err(|e| NewswireError::InvalidArg(format!("http client: {e}")))?;
        Ok(Self { inner, source })
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// Cancellation aborts the in-flight request; HTTP status failures carry
    /// the status code; provider rate-limit responses (429) surface as
    /// `RateLimited`.
    ///
    /// # Errors
    /// `Cancelled`, `SourceTimeout`, `RateLimited`, `Source`, or `Decode`.
    pub async fn get_json(
        &self,
        url: Url,
        cancel: &CancellationToken,
    ) -> Result<serde_json::Value, NewswireError> {
        let send = self.inner.get(url).send();
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(NewswireError::Cancelled),
            r = send => r.map_err(|e| self.map_send_error(&e))?,
        };

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(NewswireError::RateLimited {
                source: self.source.to_string(),
                retry_in_ms: 0,
            });
        }
        if !status.is_success() {
            return Err(NewswireError::source(
                self.source,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(NewswireError::Cancelled),
            b = response.bytes() => b.map_err(|e| self.map_send_error(&e))?,
        };
        serde_json::from_slice(&body).map_err(|e| NewswireError::decode(self.source, e.to_string()))
    }

    fn map_send_error(&self, e: &reqwest::Error) -> NewswireError {
        if e.is_timeout() {
            NewswireError::source_timeout(self.source)
        } else {
            NewswireError::source(self.source, e.to_string())
        }
    }
}
