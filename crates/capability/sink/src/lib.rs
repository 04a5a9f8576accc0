//! 下游消息汇抽象与实现。

mod in_memory;
mod mqtt;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

pub use in_memory::InMemorySink;
pub use mqtt::{MqttSink, MqttSinkConfig};

/// 路由属性键：消息来源。
pub const PROPERTY_SOURCE: &str = "source";
/// 路由属性键：消息名称。
pub const PROPERTY_NAME: &str = "name";

/// 消息汇错误。
#[derive(Debug, Clone, thiserror::Error)]
pub enum SinkError {
    #[error("publish error: {0}")]
    Publish(String),
    #[error("config error: {0}")]
    Config(String),
}

/// 随每条消息发送的路由属性，初始化时构造一次后只读。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageProperties {
    entries: BTreeMap<String, String>,
}

impl MessageProperties {
    /// 固定的 `source` / `name` 属性。
    pub fn routing(source: impl Into<String>, name: impl Into<String>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(PROPERTY_SOURCE.to_string(), source.into());
        entries.insert(PROPERTY_NAME.to_string(), name.into());
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 发往消息汇的消息。
#[derive(Debug, Clone)]
pub struct SinkMessage {
    pub payload: Vec<u8>,
    pub properties: Arc<MessageProperties>,
}

impl SinkMessage {
    pub fn new(payload: impl Into<Vec<u8>>, properties: Arc<MessageProperties>) -> Self {
        Self {
            payload: payload.into(),
            properties,
        }
    }
}

/// 消息汇抽象：发布即返回，不等待确认。
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn publish(&self, message: SinkMessage) -> Result<(), SinkError>;
}
