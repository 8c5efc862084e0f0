use crate::error::OrgBridgeError;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

type Result<T> = std::result::Result<T, OrgBridgeError>;

/// Retry configuration for commit batches
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries
    pub max_retries: usize,
    /// Initial delay between retries (milliseconds)
    pub initial_delay_ms: u64,
    /// Maximum delay between retries (milliseconds)
    pub max_delay_ms: u64,
    /// Exponential backoff multiplier
    pub multiplier: f64,
    /// Whether to use jitter
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 60000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Trait for retryable operations
pub trait Retryable {
    /// Check if the error is retryable
    fn is_retryable(&self) -> bool;
}

/// Execute an operation with retries
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, E>>,
    E: std::error::Error + Retryable + Into<OrgBridgeError>,
{
    let mut attempt = 0;
    let mut delay_ms = config.initial_delay_ms;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{} succeeded after {} retries", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(err) => {
                if !err.is_retryable() || attempt >= config.max_retries {
                    warn!(
                        "{} failed after {} attempts: {}",
                        operation_name,
                        attempt + 1,
                        err
                    );
                    return Err(err.into());
                }

                attempt += 1;

                let mut actual_delay = delay_ms;
                if config.jitter {
                    use rand::Rng;
                    let jitter = rand::thread_rng().gen_range(0..=delay_ms / 4);
                    actual_delay = delay_ms.saturating_add(jitter);
                }

                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {}ms...",
                    operation_name, attempt, config.max_retries, err, actual_delay
                );

                sleep(Duration::from_millis(actual_delay)).await;

                delay_ms = ((delay_ms as f64) * config.multiplier) as u64;
                if delay_ms > config.max_delay_ms {
                    delay_ms = config.max_delay_ms;
                }
            }
        }
    }
}

impl Retryable for std::io::Error {
    fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::NotConnected
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::TimedOut
                | std::io::ErrorKind::Interrupted
                | std::io::ErrorKind::UnexpectedEof
                | std::io::ErrorKind::WouldBlock
        )
    }
}

impl Retryable for OrgBridgeError {
    fn is_retryable(&self) -> bool {
        match self {
            OrgBridgeError::Io(_) => true,
            OrgBridgeError::Http(msg) => {
                msg.contains("timeout")
                    || msg.contains("connection")
                    || msg.contains("unavailable")
                    || msg.contains("Too Many Requests")
            }
            // Commit errors from partial outages may clear up
            OrgBridgeError::Commit { .. } => true,
            // Initialization, validation and query errors are never retried
            _ => false,
        }
    }
}
