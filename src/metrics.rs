use std::sync::atomic::{AtomicU64, Ordering};

use crate::publish::DeliveryReport;

/// Thread-safe counters describing service activity since startup.
#[derive(Default)]
pub struct ServiceMetrics {
    documents_ingested: AtomicU64,
    emails_composed: AtomicU64,
    provider_failures: AtomicU64,
    deliveries_attempted: AtomicU64,
    deliveries_succeeded: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stored document; `provider_failed` when its summary is an error message.
    pub fn record_document(&self, provider_failed: bool) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        if provider_failed {
            self.provider_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a composed email.
    pub fn record_email(&self, provider_failed: bool) {
        self.emails_composed.fetch_add(1, Ordering::Relaxed);
        if provider_failed {
            self.provider_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record an outbound delivery. Skipped (not configured) deliveries are not counted.
    pub fn record_delivery(&self, report: &DeliveryReport) {
        if report.demo {
            return;
        }
        self.deliveries_attempted.fetch_add(1, Ordering::Relaxed);
        if report.success {
            self.deliveries_succeeded.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            emails_composed: self.emails_composed.load(Ordering::Relaxed),
            provider_failures: self.provider_failures.load(Ordering::Relaxed),
            deliveries_attempted: self.deliveries_attempted.load(Ordering::Relaxed),
            deliveries_succeeded: self.deliveries_succeeded.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of service counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents stored since startup.
    pub documents_ingested: u64,
    /// Emails composed since startup.
    pub emails_composed: u64,
    /// Language-model calls that ended in an error.
    pub provider_failures: u64,
    /// Index/channel requests actually sent.
    pub deliveries_attempted: u64,
    /// Index/channel requests accepted by the remote side.
    pub deliveries_succeeded: u64,
}
