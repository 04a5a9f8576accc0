//! historian 桥接宿主进程：加载配置，装配 MQTT 消息汇，驱动模块生命周期。

use bridge_config::AppConfig;
use bridge_historian::{HistorianClient, NoopHistorian};
use bridge_lifecycle::HistorianModule;
use bridge_sink::{MqttSink, MqttSinkConfig};
use bridge_telemetry::{init_tracing, metrics};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    init_tracing();

    let module_config = tokio::fs::read(&config.module_config_path).await?;

    let (sink, _eventloop) = MqttSink::connect(MqttSinkConfig {
        host: config.mqtt_host.clone(),
        port: config.mqtt_port,
        username: config.mqtt_username.clone(),
        password: config.mqtt_password.clone(),
        topic_prefix: config.mqtt_topic_prefix.clone(),
        qos: config.mqtt_qos,
    })?;
    info!(
        "sink: mqtt {}:{} prefix={}",
        config.mqtt_host, config.mqtt_port, config.mqtt_topic_prefix
    );

    // 未链接厂商 SDK 时使用占位客户端
    let historian: Arc<dyn HistorianClient> = Arc::new(NoopHistorian);
    info!("historian client: noop");

    let mut module = HistorianModule::new(historian, Arc::new(sink));
    module.initialize(&module_config).await?;
    // 启动失败时模块已完成拆除，不重试
    module.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    let failures = module.stop().await;
    if !failures.is_empty() {
        warn!(failures = failures.len(), "teardown finished with failures");
    }
    let snapshot = metrics().snapshot();
    info!(
        published = snapshot.readings_published,
        publish_failures = snapshot.publish_failures,
        dropped = snapshot.changes_dropped,
        "bridge stopped"
    );
    Ok(())
}
