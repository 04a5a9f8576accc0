//! 日志初始化与进程级计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub changes_received: u64,
    pub changes_dropped: u64,
    pub readings_published: u64,
    pub publish_failures: u64,
    pub subscriptions_issued: u64,
    pub teardown_failures: u64,
}

/// 基础计数器。
pub struct TelemetryMetrics {
    changes_received: AtomicU64,
    changes_dropped: AtomicU64,
    readings_published: AtomicU64,
    publish_failures: AtomicU64,
    subscriptions_issued: AtomicU64,
    teardown_failures: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            changes_received: AtomicU64::new(0),
            changes_dropped: AtomicU64::new(0),
            readings_published: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            subscriptions_issued: AtomicU64::new(0),
            teardown_failures: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            changes_received: self.changes_received.load(Ordering::Relaxed),
            changes_dropped: self.changes_dropped.load(Ordering::Relaxed),
            readings_published: self.readings_published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            subscriptions_issued: self.subscriptions_issued.load(Ordering::Relaxed),
            teardown_failures: self.teardown_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 记录收到的变化通知条数。
pub fn record_changes_received(count: u64) {
    metrics()
        .changes_received
        .fetch_add(count, Ordering::Relaxed);
}

/// 记录处理器解绑后被丢弃的通知条数。
pub fn record_changes_dropped(count: u64) {
    metrics().changes_dropped.fetch_add(count, Ordering::Relaxed);
}

/// 记录发布成功次数。
pub fn record_reading_published() {
    metrics().readings_published.fetch_add(1, Ordering::Relaxed);
}

/// 记录发布失败次数。
pub fn record_publish_failure() {
    metrics().publish_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录下发的订阅数。
pub fn record_subscription_issued() {
    metrics()
        .subscriptions_issued
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录拆除阶段的失败步骤数。
pub fn record_teardown_failure() {
    metrics().teardown_failures.fetch_add(1, Ordering::Relaxed);
}
