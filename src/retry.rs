use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::TransactionConfig;
use crate::error::SdkError;
use crate::logging::{ErrorLogger, LogContext, PerformanceMonitor};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt in milliseconds
    pub initial_delay_ms: u64,
    /// Upper bound for any delay in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier applied to the delay after each failed attempt
    pub backoff_multiplier: f64,
    /// Whether to add up to 10% jitter to each delay
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 300,
            max_delay_ms: 300,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Fixed-delay policy used when a submitted transaction collides on its nonce
    pub fn for_nonce_collision(config: &TransactionConfig) -> Self {
        Self {
            max_attempts: config.nonce_retry_attempts,
            initial_delay_ms: config.nonce_retry_delay_ms,
            max_delay_ms: config.nonce_retry_delay_ms,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

/// Bounded retry loop with a caller-supplied retry decision
pub struct RetryManager {
    config: RetryConfig,
    operation_name: String,
}

impl RetryManager {
    pub fn new(operation_name: &str, config: RetryConfig) -> Self {
        Self {
            config,
            operation_name: operation_name.to_string(),
        }
    }

    /// Execute `operation`, retrying while `should_retry` approves the error and attempts remain.
    ///
    /// The last error is returned unmodified once the budget is spent.
    pub async fn execute_with_handler<T, F, Fut, H>(
        &self,
        operation: F,
        should_retry: H,
    ) -> Result<T, SdkError>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<T, SdkError>>,
        H: Fn(&SdkError, u32) -> bool,
    {
        let monitor = PerformanceMonitor::new(&format!("retry_{}", self.operation_name));
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(result) => {
                    if attempt > 1 {
                        ErrorLogger::log_recovery_success(
                            &self.operation_name,
                            attempt,
                            monitor.start_time.elapsed().unwrap_or_default().as_millis() as u64,
                        );
                    }
                    return Ok(result);
                }
                Err(error) => {
                    if !should_retry(&error, attempt) {
                        LogContext::new("retry", &self.operation_name)
                            .with_retry_count(attempt)
                            .debug(&format!("Error is not retryable: {}", error));
                        return Err(error);
                    }

                    ErrorLogger::log_retry_attempt(&self.operation_name, &error, attempt, max_attempts);

                    if attempt >= max_attempts {
                        return Err(error);
                    }

                    sleep(self.calculate_delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Delay to wait after the given failed attempt
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.config.initial_delay_ms as f64;
        let exponential_delay = base_delay * self.config.backoff_multiplier.powi(attempt as i32 - 1);

        let capped_delay = exponential_delay.min(self.config.max_delay_ms as f64);

        let final_delay = if self.config.jitter {
            let jitter = capped_delay * 0.1 * (rand::random::<f64>() - 0.5);
            (capped_delay + jitter).max(0.0)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}
