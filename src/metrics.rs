use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};

pub const LEDGER_OPERATIONS_TOTAL: &str = "finance_tracker_ledger_operations_total";
pub const LEDGER_OPERATION_DURATION: &str = "finance_tracker_ledger_operation_duration_seconds";
pub const REJECTIONS_TOTAL: &str = "finance_tracker_rejections_total";
pub const ERRORS_TOTAL: &str = "finance_tracker_errors_total";
pub const CURRENT_BALANCE: &str = "finance_tracker_current_balance";
pub const BACKUP_BYTES: &str = "finance_tracker_backup_size_bytes";

#[derive(Debug, Default)]
struct Tallies {
    operations: AtomicU64,
    failures: AtomicU64,
    rejections: AtomicU64,
}

/// Point-in-time copy of the local tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub operations: u64,
    pub failures: u64,
    pub rejections: u64,
}

/// Metrics collection and management.
///
/// Everything is forwarded to the `metrics` facade (a no-op until the binary
/// installs a recorder) and also tallied locally so callers can inspect it.
/// Clones share the same tallies.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    tallies: Arc<Tallies>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed (or failed) ledger operation
    pub fn record_operation(&self, operation: &'static str, duration: Duration, success: bool) {
        let status = if success { "success" } else { "error" };
        counter!(LEDGER_OPERATIONS_TOTAL, "operation" => operation, "status" => status).increment(1);
        histogram!(LEDGER_OPERATION_DURATION, "operation" => operation).record(duration.as_secs_f64());

        self.tallies.operations.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.tallies.failures.fetch_add(1, Ordering::Relaxed);
            counter!(ERRORS_TOTAL, "operation" => operation).increment(1);
        }
    }

    /// Record a business-rule rejection such as an insufficient balance
    pub fn record_rejection(&self, operation: &'static str, reason: &'static str) {
        counter!(REJECTIONS_TOTAL, "operation" => operation, "reason" => reason).increment(1);
        self.tallies.rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_current_balance(&self, balance: f64) {
        gauge!(CURRENT_BALANCE).set(balance);
    }

    pub fn record_backup_size(&self, bytes: u64) {
        histogram!(BACKUP_BYTES).record(bytes as f64);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            operations: self.tallies.operations.load(Ordering::Relaxed),
            failures: self.tallies.failures.load(Ordering::Relaxed),
            rejections: self.tallies.rejections.load(Ordering::Relaxed),
        }
    }

    /// Time `work` and record it under `operation`.
    ///
    /// Rejections count as successful operations and are tallied separately.
    pub fn track<T>(
        &self,
        operation: &'static str,
        work: impl FnOnce() -> crate::error::Result<T>,
    ) -> crate::error::Result<T> {
        let timer = MetricsTimer::new(self.clone(), operation);
        let result = work();
        match &result {
            Err(err) if err.is_rejection() => {
                self.record_rejection(operation, rejection_reason(err));
                timer.finish(true);
            }
            other => timer.finish(other.is_ok()),
        }
        result
    }
}

fn rejection_reason(err: &crate::error::FinanceError) -> &'static str {
    use crate::error::FinanceError;
    match err {
        FinanceError::InsufficientBalance { .. } => "insufficient_balance",
        FinanceError::InsufficientSavings { .. } => "insufficient_savings",
        FinanceError::PaymentExceedsRemaining { .. } => "payment_exceeds_remaining",
        FinanceError::ContactInUse(_) => "contact_in_use",
        _ => "invalid_input",
    }
}

/// Performance timing wrapper for metrics
pub struct MetricsTimer {
    collector: MetricsCollector,
    operation: &'static str,
    start: Instant,
}

impl MetricsTimer {
    pub fn new(collector: MetricsCollector, operation: &'static str) -> Self {
        Self { collector, operation, start: Instant::now() }
    }

    pub fn finish(self, success: bool) {
        let duration = self.start.elapsed();
        self.collector.record_operation(self.operation, duration, success);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FinanceError;

    #[test]
    fn test_track_counts_rejections_separately() {
        let collector = MetricsCollector::new();

        let _ = collector.track("loan.create", || Ok(()));
        let _: crate::error::Result<()> =
            collector.track("loan.create", || Err(FinanceError::InsufficientBalance { available: 1.0, requested: 2.0 }));
        let _: crate::error::Result<()> = collector.track("loan.create", || Err(FinanceError::Other("disk".into())));

        assert_eq!(collector.snapshot(), MetricsSnapshot { operations: 3, failures: 1, rejections: 1 });
    }

    #[test]
    fn test_clones_share_tallies() {
        let collector = MetricsCollector::new();
        collector.clone().record_rejection("tx.add", "insufficient_balance");
        assert_eq!(collector.snapshot().rejections, 1);
    }
}
