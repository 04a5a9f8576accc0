//! 连接生命周期控制器
//!
//! 状态流转：
//!
//! ```text
//! Idle -> Connecting -> Connected -> Subscribing -> Streaming -> Disconnecting -> Closed
//!             │                          │
//!             └──────────► Failed ◄──────┘   (初始化失败也直接进入 Failed)
//! ```
//!
//! 任何致命错误都不重试：记录日志、进入 `Failed`，随后立即执行拆除。

use crate::error::{ModuleError, TeardownError};
use crate::registry::SubscriptionRegistry;
use bridge_config::parse_module_config;
use bridge_historian::{HistorianClient, HistorianError};
use bridge_pipeline::{ChangeIntake, PipelineWorker, Publisher, spawn_pipeline};
use bridge_sink::{MessageSink, SinkMessage};
use bridge_telemetry::{record_subscription_issued, record_teardown_failure};
use domain::ConnectionConfig;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 生命周期状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Idle,
    Connecting,
    Connected,
    Subscribing,
    Streaming,
    Disconnecting,
    Closed,
    Failed,
}

/// historian 桥接模块，由宿主依次调用 `initialize` / `start` / `stop`。
pub struct HistorianModule {
    client: Arc<dyn HistorianClient>,
    sink: Arc<dyn MessageSink>,
    state: ModuleState,
    config: Option<ConnectionConfig>,
    publisher: Option<Arc<Publisher>>,
    registry: SubscriptionRegistry,
    intake: Option<Arc<ChangeIntake>>,
    worker: Option<PipelineWorker>,
    /// 是否已尝试建立会话（决定拆除时是否调用客户端）。
    session_attempted: bool,
}

impl HistorianModule {
    pub fn new(client: Arc<dyn HistorianClient>, sink: Arc<dyn MessageSink>) -> Self {
        Self {
            client,
            sink,
            state: ModuleState::Idle,
            config: None,
            publisher: None,
            registry: SubscriptionRegistry::new(),
            intake: None,
            worker: None,
            session_attempted: false,
        }
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn config(&self) -> Option<&ConnectionConfig> {
        self.config.as_ref()
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// 解析配置并准备订阅集合与发布器；配置非法时进入 `Failed` 并拆除。
    pub async fn initialize(&mut self, configuration: &[u8]) -> Result<(), ModuleError> {
        if self.state != ModuleState::Idle || self.config.is_some() {
            return Err(ModuleError::InvalidState {
                operation: "initialize",
                state: self.state,
            });
        }
        info!(target: "bridge.lifecycle", "module_initializing");

        let config = match parse_module_config(configuration) {
            Ok(config) => config,
            Err(err) => {
                error!(target: "bridge.lifecycle", error = %err, "module_not_initialized");
                self.state = ModuleState::Failed;
                self.teardown().await;
                return Err(err.into());
            }
        };

        for subscription in &config.subscriptions {
            self.registry.add(subscription.clone());
        }
        self.publisher = Some(Arc::new(Publisher::new(
            self.sink.clone(),
            config.print_diagnostics,
        )));
        info!(
            target: "bridge.lifecycle",
            host = %config.host,
            subscriptions = self.registry.len(),
            print_diagnostics = config.print_diagnostics,
            "module_initialized"
        );
        self.config = Some(config);
        Ok(())
    }

    /// 建立会话、注册回调并逐个下发订阅。
    pub async fn start(&mut self) -> Result<(), ModuleError> {
        let (config, publisher) = match (self.config.clone(), self.publisher.clone()) {
            (Some(config), Some(publisher)) if self.state == ModuleState::Idle => {
                (config, publisher)
            }
            _ => {
                return Err(ModuleError::InvalidState {
                    operation: "start",
                    state: self.state,
                });
            }
        };
        info!(target: "bridge.lifecycle", host = %config.host, "module_starting");

        self.state = ModuleState::Connecting;
        self.session_attempted = true;
        if let Err(err) = self.client.connect(&config).await {
            return Err(self.fail(err).await);
        }
        self.state = ModuleState::Connected;

        // 回调先于订阅注册，订阅生效后推送即可入队
        let (intake, worker) = spawn_pipeline(publisher);
        self.worker = Some(worker);
        self.intake = Some(intake.clone());
        if let Err(err) = self.client.set_change_handler(intake) {
            return Err(self.fail(err).await);
        }

        self.state = ModuleState::Subscribing;
        let subscriptions = self.registry.all().to_vec();
        for subscription in &subscriptions {
            if let Err(err) = self.client.subscribe(subscription).await {
                return Err(self.fail(err).await);
            }
            record_subscription_issued();
            info!(
                target: "bridge.lifecycle",
                tag = %subscription.name,
                minimum_elapsed_ms = subscription.minimum_elapsed_ms,
                "subscribed"
            );
        }

        self.state = ModuleState::Streaming;
        info!(
            target: "bridge.lifecycle",
            subscriptions = subscriptions.len(),
            "module_started"
        );
        Ok(())
    }

    /// 拆除：尽力而为，任何状态都可调用，结束于 `Closed`。
    pub async fn stop(&mut self) -> Vec<TeardownError> {
        if self.state == ModuleState::Closed {
            debug!(target: "bridge.lifecycle", "module_already_closed");
            return Vec::new();
        }
        self.state = ModuleState::Disconnecting;
        let failures = self.teardown().await;
        self.state = ModuleState::Closed;
        failures
    }

    /// 入站消息处理：模块只作为数据源，不处理任何入站消息。
    pub fn receive(&self, message: &SinkMessage) {
        debug!(
            target: "bridge.lifecycle",
            payload_size = message.payload.len(),
            "inbound_message_ignored"
        );
    }

    async fn fail(&mut self, err: HistorianError) -> ModuleError {
        error!(
            target: "bridge.lifecycle",
            state = ?self.state,
            error = %err,
            "module_start_failed"
        );
        self.state = ModuleState::Failed;
        self.teardown().await;
        ModuleError::Connection(err)
    }

    async fn teardown(&mut self) -> Vec<TeardownError> {
        info!(target: "bridge.lifecycle", state = ?self.state, "module_closing");
        let mut failures = Vec::new();

        if self.session_attempted {
            if let Err(err) = self.client.drop_subscriptions().await {
                failures.push(TeardownError::DropSubscriptions(err));
            }
        }

        if let Some(intake) = self.intake.take() {
            if let Err(err) = self.client.clear_change_handler() {
                failures.push(TeardownError::DetachHandler(err));
            }
            // SDK 仍持有旧回调时，关闭入口保证不再发布
            intake.close();
        }

        if self.session_attempted {
            if let Err(err) = self.client.disconnect().await {
                failures.push(TeardownError::Disconnect(err));
            }
            self.session_attempted = false;
        }

        self.registry.clear();

        if let Some(worker) = self.worker.take() {
            match worker.join().await {
                Ok(published) => {
                    debug!(
                        target: "bridge.lifecycle",
                        published = published,
                        "publish_worker_stopped"
                    );
                }
                Err(err) => failures.push(TeardownError::Worker(err.to_string())),
            }
        }

        for failure in &failures {
            record_teardown_failure();
            warn!(target: "bridge.lifecycle", error = %failure, "teardown_step_failed");
        }
        info!(
            target: "bridge.lifecycle",
            failures = failures.len(),
            "module_closed"
        );
        failures
    }
}
