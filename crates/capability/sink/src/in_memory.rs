//! 内存消息汇
//!
//! 仅用于本地测试和占位。

use crate::{MessageSink, SinkError, SinkMessage};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// 内存消息汇：记录所有已发布消息。
#[derive(Default)]
pub struct InMemorySink {
    messages: Mutex<Vec<SinkMessage>>,
    fail: AtomicBool,
    reject_patterns: Mutex<Vec<String>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后的发布全部失败（或恢复）。
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// payload 含有指定片段的发布失败，其余照常记录。
    pub fn fail_when_payload_contains(&self, pattern: impl Into<String>) {
        if let Ok(mut patterns) = self.reject_patterns.lock() {
            patterns.push(pattern.into());
        }
    }

    fn rejects(&self, payload: &[u8]) -> bool {
        let text = String::from_utf8_lossy(payload);
        self.reject_patterns
            .lock()
            .map(|patterns| patterns.iter().any(|pattern| text.contains(pattern.as_str())))
            .unwrap_or(false)
    }

    pub fn messages(&self) -> Vec<SinkMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// 以 UTF-8 文本返回所有 payload（用于测试）。
    pub fn payloads(&self) -> Vec<String> {
        self.messages()
            .iter()
            .map(|message| String::from_utf8_lossy(&message.payload).into_owned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MessageSink for InMemorySink {
    async fn publish(&self, message: SinkMessage) -> Result<(), SinkError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::Publish("forced failure".to_string()));
        }
        if self.rejects(&message.payload) {
            return Err(SinkError::Publish("rejected payload".to_string()));
        }
        let mut messages = self
            .messages
            .lock()
            .map_err(|_| SinkError::Publish("lock failed".to_string()))?;
        messages.push(message);
        Ok(())
    }
}
