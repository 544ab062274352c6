//! Retry utilities with exponential backoff for transport-level failures.
//!
//! Only the transport retries. Falling back from one metadata service to
//! another is a separate decision made by the resolver.

use std::time::Duration;
use tokio::time::sleep;

use super::http::TransportError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Maximum total time to spend sleeping between attempts
    pub max_total_time: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            max_total_time: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Builder-style override of the attempt count
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// A config that never retries
    pub fn none() -> Self {
        Self::default().max_attempts(1)
    }

    /// Backoff delay before attempt `attempts + 1`
    fn backoff(&self, attempts: u32) -> Duration {
        if attempts <= 1 {
            return self.initial_delay.min(self.max_delay);
        }
        let exp_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powf(attempts as f64 - 1.0);
        Duration::from_secs_f64(exp_delay).min(self.max_delay)
    }
}

/// Transport failures worth another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// Request timed out
    Timeout,
    /// Could not connect
    Network,
    /// Too many requests (429)
    TooManyRequests,
    /// Server error (5xx)
    ServerError,
}

impl TransientError {
    /// Classify a transport error. `None` means the error is permanent.
    pub fn from_transport_error(err: &TransportError) -> Option<Self> {
        match err {
            TransportError::Timeout => Some(TransientError::Timeout),
            TransportError::Connection(_) => Some(TransientError::Network),
            TransportError::Status { status: 429 } => Some(TransientError::TooManyRequests),
            TransportError::Status { status } if (500..600).contains(status) => {
                Some(TransientError::ServerError)
            }
            _ => None,
        }
    }

    /// Minimum wait imposed by the error itself, on top of the backoff
    pub fn recommended_delay(&self) -> Option<Duration> {
        match self {
            TransientError::TooManyRequests => Some(Duration::from_secs(1)),
            _ => None,
        }
    }
}

/// Execute an async operation, retrying transient transport errors with
/// exponential backoff. Permanent errors are returned immediately.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, operation: F) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, TransportError>>,
{
    let mut attempts = 0;
    let mut total_elapsed = Duration::ZERO;
    let mut operation = operation;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!(
                        "Request succeeded on attempt {} after {} transient failures",
                        attempts,
                        attempts - 1
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                let Some(transient) = TransientError::from_transport_error(&error) else {
                    return Err(error);
                };

                let delay = config.backoff(attempts);
                let delay = transient
                    .recommended_delay()
                    .map_or(delay, |recommended| delay.max(recommended));
                total_elapsed += delay;

                if attempts >= config.max_attempts || total_elapsed > config.max_total_time {
                    tracing::warn!(
                        "Request failed after {} attempts (total backoff: {:?}): {}",
                        attempts,
                        total_elapsed,
                        error
                    );
                    return Err(error);
                }

                tracing::debug!(
                    "Transient error on attempt {}: {:?}, retrying in {:?}",
                    attempts,
                    transient,
                    delay
                );
                sleep(delay).await;
            }
        }
    }
}
