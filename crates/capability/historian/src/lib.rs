//! historian 数据源能力抽象。
//!
//! 厂商 SDK 在此边界之外：会话建立、订阅与变化推送都经由 [`HistorianClient`]，
//! 推送回调由 SDK 自己的线程调用 [`ChangeHandler`]。

mod in_memory;

use async_trait::async_trait;
use domain::{ConnectionConfig, RawValueChange, TagSubscription};
use std::sync::Arc;

pub use in_memory::{HistorianCall, InMemoryHistorian};

/// historian 交互错误。
#[derive(Debug, Clone, thiserror::Error)]
pub enum HistorianError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("subscribe error: {tag}: {reason}")]
    Subscribe { tag: String, reason: String },
    #[error("session error: {0}")]
    Session(String),
}

/// 变化通知处理器，可能被多个外部线程并发调用。
pub trait ChangeHandler: Send + Sync {
    fn on_change(&self, changes: Vec<RawValueChange>);
}

/// historian 客户端抽象。
#[async_trait]
pub trait HistorianClient: Send + Sync {
    async fn connect(&self, config: &ConnectionConfig) -> Result<(), HistorianError>;

    async fn disconnect(&self) -> Result<(), HistorianError>;

    async fn subscribe(&self, subscription: &TagSubscription) -> Result<(), HistorianError>;

    async fn drop_subscriptions(&self) -> Result<(), HistorianError>;

    fn set_change_handler(&self, handler: Arc<dyn ChangeHandler>) -> Result<(), HistorianError>;

    fn clear_change_handler(&self) -> Result<(), HistorianError>;
}

/// 占位客户端（未链接厂商 SDK 时用于接线）：接受所有调用，从不推送。
#[derive(Debug, Default)]
pub struct NoopHistorian;

#[async_trait]
impl HistorianClient for NoopHistorian {
    async fn connect(&self, config: &ConnectionConfig) -> Result<(), HistorianError> {
        tracing::info!(target: "bridge.historian", host = %config.host, "noop_historian_connect");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), HistorianError> {
        Ok(())
    }

    async fn subscribe(&self, _subscription: &TagSubscription) -> Result<(), HistorianError> {
        Ok(())
    }

    async fn drop_subscriptions(&self) -> Result<(), HistorianError> {
        Ok(())
    }

    fn set_change_handler(&self, _handler: Arc<dyn ChangeHandler>) -> Result<(), HistorianError> {
        Ok(())
    }

    fn clear_change_handler(&self) -> Result<(), HistorianError> {
        Ok(())
    }
}
