//! MQTT 消息汇
//!
//! MQTT 3.1.1 不支持用户属性，路由属性编码进 topic：`{prefix}/{source}/{name}`。

use crate::{MessageSink, PROPERTY_NAME, PROPERTY_SOURCE, SinkError, SinkMessage};
use async_trait::async_trait;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::time::Duration;
use tracing::{debug, warn};

/// MQTT 消息汇配置。
#[derive(Debug, Clone)]
pub struct MqttSinkConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
    pub qos: u8,
}

/// MQTT 消息汇实现。
#[derive(Clone)]
pub struct MqttSink {
    client: AsyncClient,
    topic_prefix: String,
    qos: QoS,
}

impl MqttSink {
    /// 创建客户端并在后台驱动事件循环。
    pub fn connect(
        config: MqttSinkConfig,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), SinkError> {
        if config.host.trim().is_empty() {
            return Err(SinkError::Config("mqtt host must not be empty".to_string()));
        }
        let client_id = format!("historian-bridge-{}", uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, config.host, config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (config.username, config.password) {
            options.set_credentials(username, password);
        }
        let (client, mut eventloop) = AsyncClient::new(options, 64);
        let handle = tokio::spawn(async move {
            loop {
                if let Err(err) = eventloop.poll().await {
                    warn!(target: "bridge.sink", "mqtt sink eventloop error: {}", err);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        });
        Ok((
            Self {
                client,
                topic_prefix: config.topic_prefix,
                qos: qos_from_u8(config.qos),
            },
            handle,
        ))
    }

    fn topic_for(&self, message: &SinkMessage) -> String {
        topic_for(&self.topic_prefix, message)
    }
}

#[async_trait]
impl MessageSink for MqttSink {
    async fn publish(&self, message: SinkMessage) -> Result<(), SinkError> {
        let topic = self.topic_for(&message);
        debug!(
            target: "bridge.sink",
            topic = %topic,
            payload_size = message.payload.len(),
            "mqtt_publish"
        );
        self.client
            .publish(topic, self.qos, false, message.payload)
            .await
            .map_err(|err| SinkError::Publish(err.to_string()))
    }
}

fn topic_for(prefix: &str, message: &SinkMessage) -> String {
    let prefix = prefix.trim_end_matches('/');
    let source = message.properties.get(PROPERTY_SOURCE).unwrap_or("unknown");
    let name = message.properties.get(PROPERTY_NAME).unwrap_or("data");
    if prefix.is_empty() {
        format!("{}/{}", source, name)
    } else {
        format!("{}/{}/{}", prefix, source, name)
    }
}

fn qos_from_u8(value: u8) -> QoS {
    match value {
        0 => QoS::AtMostOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageProperties;
    use std::sync::Arc;

    fn message() -> SinkMessage {
        SinkMessage::new(
            b"[]".to_vec(),
            Arc::new(MessageProperties::routing("Historian.Module", "data")),
        )
    }

    #[test]
    fn topic_includes_routing_properties() {
        assert_eq!(topic_for("gateway/", &message()), "gateway/Historian.Module/data");
        assert_eq!(topic_for("", &message()), "Historian.Module/data");
    }

    #[test]
    fn qos_mapping() {
        assert_eq!(qos_from_u8(0), QoS::AtMostOnce);
        assert_eq!(qos_from_u8(1), QoS::AtLeastOnce);
        assert_eq!(qos_from_u8(2), QoS::ExactlyOnce);
    }
}
