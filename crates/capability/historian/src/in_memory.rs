//! 内存 historian 客户端
//!
//! 仅用于本地测试和占位：记录调用序列，支持按操作注入失败，并可模拟推送。

use crate::{ChangeHandler, HistorianClient, HistorianError};
use async_trait::async_trait;
use domain::{ConnectionConfig, RawValueChange, TagSubscription};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, RwLock};

/// 记录下来的客户端调用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistorianCall {
    Connect { host: String },
    Subscribe { tag: String, minimum_elapsed_ms: u32 },
    DropSubscriptions,
    SetChangeHandler,
    ClearChangeHandler,
    Disconnect,
}

#[derive(Debug, Default)]
struct FailurePlan {
    connect: bool,
    drop_subscriptions: bool,
    clear_change_handler: bool,
    disconnect: bool,
    subscribe_tags: HashSet<String>,
}

/// 内存 historian 客户端
#[derive(Default)]
pub struct InMemoryHistorian {
    calls: Mutex<Vec<HistorianCall>>,
    handler: RwLock<Option<Arc<dyn ChangeHandler>>>,
    failures: Mutex<FailurePlan>,
}

impl InMemoryHistorian {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_connect(&self) {
        self.with_failures(|plan| plan.connect = true);
    }

    pub fn fail_subscribe(&self, tag: impl Into<String>) {
        let tag = tag.into();
        self.with_failures(|plan| {
            plan.subscribe_tags.insert(tag);
        });
    }

    pub fn fail_drop_subscriptions(&self) {
        self.with_failures(|plan| plan.drop_subscriptions = true);
    }

    pub fn fail_clear_change_handler(&self) {
        self.with_failures(|plan| plan.clear_change_handler = true);
    }

    pub fn fail_disconnect(&self) {
        self.with_failures(|plan| plan.disconnect = true);
    }

    /// 获取调用序列（用于测试）。
    pub fn calls(&self) -> Vec<HistorianCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    /// 当前注册的处理器（模拟 SDK 侧仍持有旧回调的情形）。
    pub fn handler(&self) -> Option<Arc<dyn ChangeHandler>> {
        self.handler.read().ok().and_then(|handler| handler.clone())
    }

    /// 模拟一次推送；没有注册处理器时返回 false。
    pub fn emit(&self, changes: Vec<RawValueChange>) -> bool {
        match self.handler() {
            Some(handler) => {
                handler.on_change(changes);
                true
            }
            None => false,
        }
    }

    fn record(&self, call: HistorianCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn with_failures(&self, apply: impl FnOnce(&mut FailurePlan)) {
        if let Ok(mut plan) = self.failures.lock() {
            apply(&mut *plan);
        }
    }

    fn should_fail(&self, check: impl FnOnce(&FailurePlan) -> bool) -> bool {
        self.failures.lock().map(|plan| check(&*plan)).unwrap_or(false)
    }
}

#[async_trait]
impl HistorianClient for InMemoryHistorian {
    async fn connect(&self, config: &ConnectionConfig) -> Result<(), HistorianError> {
        self.record(HistorianCall::Connect {
            host: config.host.clone(),
        });
        if self.should_fail(|plan| plan.connect) {
            return Err(HistorianError::Connection(format!(
                "host {} unreachable",
                config.host
            )));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), HistorianError> {
        self.record(HistorianCall::Disconnect);
        if self.should_fail(|plan| plan.disconnect) {
            return Err(HistorianError::Session("disconnect failed".to_string()));
        }
        Ok(())
    }

    async fn subscribe(&self, subscription: &TagSubscription) -> Result<(), HistorianError> {
        self.record(HistorianCall::Subscribe {
            tag: subscription.name.clone(),
            minimum_elapsed_ms: subscription.minimum_elapsed_ms,
        });
        if self.should_fail(|plan| plan.subscribe_tags.contains(&subscription.name)) {
            return Err(HistorianError::Subscribe {
                tag: subscription.name.clone(),
                reason: "unknown tag".to_string(),
            });
        }
        Ok(())
    }

    async fn drop_subscriptions(&self) -> Result<(), HistorianError> {
        self.record(HistorianCall::DropSubscriptions);
        if self.should_fail(|plan| plan.drop_subscriptions) {
            return Err(HistorianError::Session("drop subscriptions failed".to_string()));
        }
        Ok(())
    }

    fn set_change_handler(&self, handler: Arc<dyn ChangeHandler>) -> Result<(), HistorianError> {
        self.record(HistorianCall::SetChangeHandler);
        let mut slot = self
            .handler
            .write()
            .map_err(|_| HistorianError::Session("lock failed".to_string()))?;
        *slot = Some(handler);
        Ok(())
    }

    fn clear_change_handler(&self) -> Result<(), HistorianError> {
        self.record(HistorianCall::ClearChangeHandler);
        if self.should_fail(|plan| plan.clear_change_handler) {
            return Err(HistorianError::Session("detach failed".to_string()));
        }
        let mut slot = self
            .handler
            .write()
            .map_err(|_| HistorianError::Session("lock failed".to_string()))?;
        *slot = None;
        Ok(())
    }
}
