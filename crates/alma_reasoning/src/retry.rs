//! Bounded retry with exponential backoff for the HTTP oracle.
//!
//! Only the provider adapter retries. Rate limits (429), request timeouts
//! (408), 5xx responses and network errors are retried; every other status
//! fails on the first attempt. The turn pipeline itself never retries.

use anyhow::Result;
use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(20),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Sleep before retry number `retry` (1-based), without jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = self.backoff_factor.powi(retry.saturating_sub(1) as i32);
        let secs = (self.initial_delay.as_secs_f64() * exp).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

/// Send the request built by `build` until it succeeds, fails permanently, or
/// the policy runs out of attempts. `label` names the endpoint in logs.
pub async fn send_with_retry<F>(policy: &RetryPolicy, label: &str, build: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_error = String::new();

    for attempt in 1..=policy.max_attempts {
        match build().send().await {
            Ok(response) if response.status().is_success() => {
                if attempt > 1 {
                    tracing::info!("{} succeeded on attempt {}", label, attempt);
                }
                return Ok(response);
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                if !is_retryable(status) {
                    anyhow::bail!("{} returned {}: {}", label, status, body);
                }
                tracing::warn!(
                    "{} returned {} (attempt {}/{}): {}",
                    label,
                    status,
                    attempt,
                    policy.max_attempts,
                    body.chars().take(200).collect::<String>()
                );
                last_error = format!("{} {}", status, body);
            }
            Err(e) => {
                tracing::warn!(
                    "{} network error (attempt {}/{}): {}",
                    label,
                    attempt,
                    policy.max_attempts,
                    e
                );
                last_error = e.to_string();
            }
        }

        if attempt < policy.max_attempts {
            let wait = policy.delay_for(attempt) + jitter();
            tracing::debug!("{} retrying in {:.1}s", label, wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }

    anyhow::bail!(
        "{} failed after {} attempts: {}",
        label,
        policy.max_attempts,
        last_error
    )
}

/// 0-250ms, seeded from the clock.
fn jitter() -> Duration {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    Duration::from_millis((nanos % 250) as u64)
}
