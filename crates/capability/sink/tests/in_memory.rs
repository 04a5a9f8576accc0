use bridge_sink::{InMemorySink, MessageProperties, MessageSink, SinkMessage};
use std::sync::Arc;

#[tokio::test]
async fn records_published_messages() {
    let sink = InMemorySink::new();
    let properties = Arc::new(MessageProperties::routing("Historian.Module", "data"));
    sink.publish(SinkMessage::new("[1]", properties.clone()))
        .await
        .expect("publish");

    let messages = sink.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].payload, b"[1]".to_vec());
    assert_eq!(messages[0].properties.get("source"), Some("Historian.Module"));
    assert_eq!(messages[0].properties.get("name"), Some("data"));
    assert!(Arc::ptr_eq(&messages[0].properties, &properties));
}

#[tokio::test]
async fn forced_failure_rejects_publish() {
    let sink = InMemorySink::new();
    sink.set_failing(true);
    let properties = Arc::new(MessageProperties::routing("s", "data"));
    let err = sink
        .publish(SinkMessage::new("x", properties))
        .await
        .expect_err("failure");
    assert_eq!(err.to_string(), "publish error: forced failure");
    assert!(sink.is_empty());
}

#[tokio::test]
async fn pattern_failure_rejects_only_matching_payloads() {
    let sink = InMemorySink::new();
    sink.fail_when_payload_contains("\"t\":\"A\"");
    let properties = Arc::new(MessageProperties::routing("s", "data"));
    let err = sink
        .publish(SinkMessage::new(r#"[{"t":"A"}]"#, properties.clone()))
        .await
        .expect_err("rejected");
    assert_eq!(err.to_string(), "publish error: rejected payload");
    sink.publish(SinkMessage::new(r#"[{"t":"B"}]"#, properties))
        .await
        .expect("publish");
    assert_eq!(sink.payloads(), vec![r#"[{"t":"B"}]"#.to_string()]);
}

#[test]
fn routing_properties_are_fixed() {
    let properties = MessageProperties::routing("s", "data");
    assert_eq!(properties.len(), 2);
    let keys: Vec<&str> = properties.iter().map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["name", "source"]);
}
