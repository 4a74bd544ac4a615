use log::{info, warn, error, debug, trace};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::LoggingConfig;
use crate::error::{ErrorSeverity, SdkError};

/// Structured logging context, emitted as one JSON line per event
pub struct LogContext {
    pub component: String,
    pub operation: String,
    pub metadata: HashMap<String, Value>,
}

impl LogContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_block_hash(self, block_hash: &str) -> Self {
        self.with_metadata("block_hash", json!(block_hash))
    }

    pub fn with_transaction_hash(self, tx_hash: &str) -> Self {
        self.with_metadata("transaction_hash", json!(tx_hash))
    }

    pub fn with_address(self, address: &str) -> Self {
        self.with_metadata("address", json!(address))
    }

    pub fn with_amount(self, amount: &str) -> Self {
        self.with_metadata("amount", json!(amount))
    }

    pub fn with_duration_ms(self, duration_ms: u64) -> Self {
        self.with_metadata("duration_ms", json!(duration_ms))
    }

    pub fn with_retry_count(self, retry_count: u32) -> Self {
        self.with_metadata("retry_count", json!(retry_count))
    }

    fn format_message(&self, level: &str, message: &str) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut log_entry = json!({
            "timestamp": timestamp,
            "level": level,
            "component": self.component,
            "operation": self.operation,
            "message": message,
        });

        for (key, value) in &self.metadata {
            log_entry[key] = value.clone();
        }

        log_entry.to_string()
    }

    pub fn info(&self, message: &str) {
        info!("{}", self.format_message("INFO", message));
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", self.format_message("WARN", message));
    }

    pub fn error(&self, message: &str) {
        error!("{}", self.format_message("ERROR", message));
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", self.format_message("DEBUG", message));
    }

    pub fn trace(&self, message: &str) {
        trace!("{}", self.format_message("TRACE", message));
    }
}

/// Measures how long an operation took and logs it on completion
pub struct PerformanceMonitor {
    pub start_time: SystemTime,
    operation: String,
    metadata: HashMap<String, Value>,
}

impl PerformanceMonitor {
    pub fn new(operation: &str) -> Self {
        Self {
            start_time: SystemTime::now(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn finish_with_result<T, E>(self, result: &Result<T, E>) -> u64
    where
        E: std::fmt::Display,
    {
        let duration = SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or_default()
            .as_millis() as u64;

        let mut context = LogContext::new("performance", &self.operation)
            .with_duration_ms(duration);

        for (key, value) in self.metadata {
            context = context.with_metadata(&key, value);
        }

        match result {
            Ok(_) => {
                context.trace(&format!("Operation completed successfully in {}ms", duration));
            }
            Err(e) => {
                context = context.with_metadata("error", json!(e.to_string()));
                context.debug(&format!("Operation failed after {}ms: {}", duration, e));
            }
        }

        duration
    }
}

/// Error logging utilities
pub struct ErrorLogger;

impl ErrorLogger {
    pub fn log_error(error: &SdkError, context: Option<LogContext>) {
        let severity = error.severity();

        let log_context = context
            .unwrap_or_else(|| LogContext::new("error", "unknown"))
            .with_metadata("error_type", json!(format!("{:?}", error)))
            .with_metadata("severity", json!(format!("{:?}", severity)))
            .with_metadata("recoverable", json!(error.is_recoverable()));

        let message = format!("Error occurred: {}", error);

        match severity {
            ErrorSeverity::Critical | ErrorSeverity::High => log_context.error(&message),
            ErrorSeverity::Medium => log_context.warn(&message),
            ErrorSeverity::Low => log_context.debug(&message),
        }
    }

    pub fn log_retry_attempt(operation: &str, error: &SdkError, attempt: u32, max_attempts: u32) {
        let context = LogContext::new("retry", operation)
            .with_retry_count(attempt)
            .with_metadata("max_attempts", json!(max_attempts))
            .with_metadata("error_type", json!(format!("{:?}", error)));

        if attempt >= max_attempts {
            context.error(&format!("Final attempt failed: {}", error));
        } else {
            context.warn(&format!("Attempt {} of {} failed: {}", attempt, max_attempts, error));
        }
    }

    pub fn log_recovery_success(operation: &str, attempts: u32, total_duration_ms: u64) {
        let context = LogContext::new("retry", "success")
            .with_metadata("operation", json!(operation))
            .with_retry_count(attempts)
            .with_duration_ms(total_duration_ms);

        context.info(&format!("Operation succeeded after {} attempts in {}ms", attempts, total_duration_ms));
    }
}

/// SDK activity metrics, written to the log
pub struct MetricsLogger;

impl MetricsLogger {
    pub fn log_rpc_call(method: &str, duration_ms: u64, success: bool) {
        let context = LogContext::new("metrics", "rpc_call")
            .with_metadata("method", json!(method))
            .with_duration_ms(duration_ms)
            .with_metadata("success", json!(success));

        if success {
            context.trace(&format!("RPC call {} completed in {}ms", method, duration_ms));
        } else {
            context.debug(&format!("RPC call {} failed after {}ms", method, duration_ms));
        }
    }

    pub fn log_transaction_submitted(tx_hash: &str, to: &str, nonce: u64, attempts: u32) {
        let context = LogContext::new("metrics", "transaction_submitted")
            .with_transaction_hash(tx_hash)
            .with_address(to)
            .with_metadata("nonce", json!(nonce))
            .with_retry_count(attempts);

        context.info(&format!("Transaction {} submitted with nonce {}", tx_hash, nonce));
    }

    pub fn log_notification_dispatched(kind: &str, id: &str, watcher_count: usize) {
        let context = LogContext::new("metrics", "notification_dispatched")
            .with_metadata("kind", json!(kind))
            .with_metadata("id", json!(id))
            .with_metadata("watcher_count", json!(watcher_count));

        context.trace(&format!("Dispatched {} notification {} to {} watchers", kind, id, watcher_count));
    }

    pub fn log_transfer_observed(tx_hash: &str, status: &str, amount: &str, is_token: bool) {
        let context = LogContext::new("metrics", "transfer_observed")
            .with_transaction_hash(tx_hash)
            .with_amount(amount)
            .with_metadata("status", json!(status))
            .with_metadata("is_token", json!(is_token));

        context.debug(&format!("Observed {} transfer {} ({})",
            if is_token { "token" } else { "ether" }, tx_hash, status));
    }
}

/// Install the process-wide logger. Only binaries call this; the library never does.
pub fn init_logging(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pretty = config.format == "pretty";

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.level.as_str()))
        .format(move |buf, record| {
            use std::io::Write;

            // Structured lines are JSON already; pretty mode re-indents them
            match serde_json::from_str::<Value>(record.args().to_string().as_str()) {
                Ok(json_value) if pretty => {
                    writeln!(buf, "{}", serde_json::to_string_pretty(&json_value)?)
                }
                Ok(json_value) => writeln!(buf, "{}", json_value),
                Err(_) => writeln!(
                    buf,
                    "{} [{}] {}: {}",
                    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    record.args()
                ),
            }
        })
        .try_init()?;

    info!("Logging initialized at level {}", config.level);
    Ok(())
}
