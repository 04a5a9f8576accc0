//! 变化通知 -> 规范化读数 -> 消息汇 的发布链路。
//!
//! historian 回调线程只做入队（[`ChangeIntake`]），单个 worker 按到达顺序
//! 转换并发布，消息汇同一时刻只有一个调用在途。

use async_trait::async_trait;
use bridge_historian::ChangeHandler;
use bridge_normalize::translate;
use bridge_sink::{MessageProperties, MessageSink, SinkError, SinkMessage};
use bridge_telemetry::{
    record_changes_dropped, record_changes_received, record_publish_failure,
    record_reading_published,
};
use domain::{CanonicalReading, Envelope, RawValueChange};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// 模块来源标识（路由属性 `source`）。
pub const MODULE_SOURCE: &str = "Proficy.Historian.Module";
/// 路由属性 `name` 的固定值。
pub const MESSAGE_NAME: &str = "data";

/// 发布链路错误。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("worker error: {0}")]
    Worker(String),
}

/// 将单条读数编码为线上 payload：`[` + 信封 JSON + `]`。
pub fn encode_payload(reading: &CanonicalReading) -> Result<String, PipelineError> {
    let envelope = serde_json::to_string(&Envelope::single(reading))?;
    Ok(format!("[{}]", envelope))
}

/// 读数发布抽象。
#[async_trait]
pub trait ReadingPublisher: Send + Sync {
    async fn publish(&self, reading: &CanonicalReading) -> Result<(), PipelineError>;
}

/// 信封发布器。
#[derive(Clone)]
pub struct Publisher {
    sink: Arc<dyn MessageSink>,
    properties: Arc<MessageProperties>,
    print_diagnostics: bool,
}

impl Publisher {
    pub fn new(sink: Arc<dyn MessageSink>, print_diagnostics: bool) -> Self {
        Self::with_properties(
            sink,
            Arc::new(MessageProperties::routing(MODULE_SOURCE, MESSAGE_NAME)),
            print_diagnostics,
        )
    }

    pub fn with_properties(
        sink: Arc<dyn MessageSink>,
        properties: Arc<MessageProperties>,
        print_diagnostics: bool,
    ) -> Self {
        Self {
            sink,
            properties,
            print_diagnostics,
        }
    }

    pub fn properties(&self) -> &Arc<MessageProperties> {
        &self.properties
    }
}

#[async_trait]
impl ReadingPublisher for Publisher {
    async fn publish(&self, reading: &CanonicalReading) -> Result<(), PipelineError> {
        let payload = encode_payload(reading)?;
        let message = SinkMessage::new(payload.as_bytes(), self.properties.clone());
        self.sink.publish(message).await?;
        if self.print_diagnostics {
            info!(target: "bridge.diagnostics", "sent: {}", payload);
        }
        Ok(())
    }
}

/// 回调入口：historian 线程调用，只负责入队。
pub struct ChangeIntake {
    sender: RwLock<Option<UnboundedSender<RawValueChange>>>,
}

impl ChangeIntake {
    fn new(sender: UnboundedSender<RawValueChange>) -> Self {
        Self {
            sender: RwLock::new(Some(sender)),
        }
    }

    /// 关闭入口；之后到达的通知被丢弃，worker 处理完已入队的通知后退出。
    pub fn close(&self) {
        if let Ok(mut sender) = self.sender.write() {
            sender.take();
        }
    }

    pub fn is_open(&self) -> bool {
        self.sender
            .read()
            .map(|sender| sender.is_some())
            .unwrap_or(false)
    }
}

impl ChangeHandler for ChangeIntake {
    fn on_change(&self, changes: Vec<RawValueChange>) {
        let count = changes.len() as u64;
        record_changes_received(count);
        let guard = match self.sender.read() {
            Ok(guard) => guard,
            Err(_) => {
                record_changes_dropped(count);
                return;
            }
        };
        let Some(sender) = guard.as_ref() else {
            record_changes_dropped(count);
            debug!(target: "bridge.pipeline", dropped = count, "intake_closed");
            return;
        };
        for change in changes {
            if sender.send(change).is_err() {
                record_changes_dropped(1);
            }
        }
    }
}

/// 发布 worker 句柄。
pub struct PipelineWorker {
    handle: tokio::task::JoinHandle<u64>,
}

impl PipelineWorker {
    /// 等待 worker 处理完剩余通知，返回成功发布的条数。
    pub async fn join(self) -> Result<u64, PipelineError> {
        self.handle
            .await
            .map_err(|err| PipelineError::Worker(err.to_string()))
    }
}

/// 启动单 worker 发布链路。
pub fn spawn_pipeline(publisher: Arc<dyn ReadingPublisher>) -> (Arc<ChangeIntake>, PipelineWorker) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let intake = Arc::new(ChangeIntake::new(sender));
    let handle = tokio::spawn(run_worker(receiver, publisher));
    (intake, PipelineWorker { handle })
}

async fn run_worker(
    mut receiver: UnboundedReceiver<RawValueChange>,
    publisher: Arc<dyn ReadingPublisher>,
) -> u64 {
    let mut published = 0;
    while let Some(change) = receiver.recv().await {
        let reading = translate(&change);
        match publisher.publish(&reading).await {
            Ok(()) => {
                published += 1;
                record_reading_published();
            }
            Err(err) => {
                // 不重试：记录后继续处理下一条
                record_publish_failure();
                warn!(
                    target: "bridge.pipeline",
                    tag = %reading.t,
                    error = %err,
                    "publish_failed"
                );
            }
        }
    }
    published
}
