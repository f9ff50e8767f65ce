//! JSON-over-HTTP plumbing shared by every model backend.
//!
//! Failures are classified into the domain taxonomy:
//! - 401/403 → `Authentication`, never retried
//! - 404 → `ProviderUnavailable` (unknown model or endpoint), never retried
//! - 429, 5xx, timeouts, dropped connections → `TransientNetwork`, retried
//! - connection refused → `TransientNetwork`, retried, then `ProviderUnavailable`
//! - any other 4xx → `ExternalService`, never retried
//!
//! Retries back off exponentially from [`RetryPolicy::base_delay`], doubling
//! each attempt and capped at 2^5 times the base. Once attempts run out a 503
//! or a refused connection is reported as `ProviderUnavailable`.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use crate::domain::DomainError;
use crate::infrastructure::config::HttpConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(500),
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(5);
        self.base_delay * (1u32 << exponent)
    }
}

/// A JSON client for one provider, with its retry and logging settings.
#[derive(Debug, Clone)]
pub struct JsonClient {
    client: reqwest::Client,
    provider: &'static str,
    retry: RetryPolicy,
    log_requests: bool,
    log_responses: bool,
}

impl JsonClient {
    pub fn new(provider: &'static str, config: &HttpConfig) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            provider,
            retry: RetryPolicy::new(config.max_retries),
            log_requests: config.log_requests,
            log_responses: config.log_responses,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// POSTs `body` as JSON and decodes the JSON reply, retrying transient
    /// failures.
    pub async fn post<B, R>(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<R, DomainError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        if self.log_requests {
            let json = serde_json::to_string(body).unwrap_or_default();
            info!(provider = self.provider, url, body = %json, "request");
        }

        let mut attempt = 0;
        loop {
            match self.send_once(url, bearer, body).await {
                Ok(text) => {
                    if self.log_responses {
                        info!(provider = self.provider, url, body = %text, "response");
                    }
                    return serde_json::from_str(&text).map_err(|e| {
                        error!(provider = self.provider, error = %e, "failed to parse response");
                        DomainError::internal(format!(
                            "{} returned an unexpected response: {e}",
                            self.provider
                        ))
                    });
                }
                Err(failure)
                    if failure.error.is_retryable() && attempt < self.retry.max_retries =>
                {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        provider = self.provider,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure.error,
                        "retrying backend call"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(failure) => {
                    error!(
                        provider = self.provider,
                        attempts = attempt + 1,
                        error = %failure.error,
                        "backend call failed"
                    );
                    return Err(failure.into_final());
                }
            }
        }
    }

    async fn send_once<B>(
        &self,
        url: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<String, Failure>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport(self.provider, &e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| classify_transport(self.provider, &e))?;

        debug!(provider = self.provider, %status, bytes = text.len(), "backend replied");

        if status.is_success() {
            Ok(text)
        } else {
            Err(classify_status(self.provider, status, &text))
        }
    }
}

/// One failed attempt. `error.is_retryable()` decides whether to try again;
/// `service_unavailable` upgrades a final transient error.
#[derive(Debug)]
struct Failure {
    error: DomainError,
    service_unavailable: bool,
}

impl Failure {
    fn into_final(self) -> DomainError {
        match self.error {
            DomainError::TransientNetwork(msg) if self.service_unavailable => {
                DomainError::ProviderUnavailable(msg)
            }
            other => other,
        }
    }
}

fn classify_status(provider: &str, status: StatusCode, body: &str) -> Failure {
    let detail = error_detail(body);
    let msg = format!("{provider} returned {status}: {detail}");

    let error = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DomainError::auth(msg),
        StatusCode::NOT_FOUND => DomainError::unavailable(msg),
        StatusCode::TOO_MANY_REQUESTS => DomainError::transient(msg),
        s if s.is_server_error() => DomainError::transient(msg),
        _ => DomainError::external(msg),
    };

    Failure {
        error,
        service_unavailable: status == StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn classify_transport(provider: &str, e: &reqwest::Error) -> Failure {
    if e.is_connect() {
        Failure {
            error: DomainError::transient(format!("cannot connect to {provider}: {e}")),
            service_unavailable: true,
        }
    } else if e.is_builder() {
        Failure {
            error: DomainError::config(format!("invalid {provider} request: {e}")),
            service_unavailable: false,
        }
    } else {
        Failure {
            error: DomainError::transient(format!("{provider} request failed: {e}")),
            service_unavailable: false,
        }
    }
}

/// Pulls `error.message` (OpenAI) or `error` (Ollama) out of an error body.
fn error_detail(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let detail = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("error"))
            .and_then(|e| e.as_str())
            .map(str::to_string)
    });
    detail.unwrap_or_else(|| body.trim().to_string())
}
