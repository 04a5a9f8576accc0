use bridge_historian::{ChangeHandler, HistorianCall, InMemoryHistorian};
use bridge_lifecycle::{HistorianModule, ModuleError, ModuleState, TeardownError};
use bridge_sink::{InMemorySink, MessageProperties, SinkMessage};
use chrono::{Local, TimeZone};
use domain::{Quality, RawValueChange};
use std::sync::Arc;

const MINIMAL_CONFIG: &[u8] =
    br#"{"ServerName":"h","UserName":"u","Password":"p","TagsToSubscribe":[{"TagName":"T1"}]}"#;

fn module() -> (HistorianModule, Arc<InMemoryHistorian>, Arc<InMemorySink>) {
    let historian = Arc::new(InMemoryHistorian::new());
    let sink = Arc::new(InMemorySink::new());
    let module = HistorianModule::new(historian.clone(), sink.clone());
    (module, historian, sink)
}

fn sample_change() -> RawValueChange {
    let ts = Local
        .with_ymd_and_hms(2024, 1, 2, 3, 4, 5)
        .single()
        .expect("time");
    RawValueChange::new("T1", 1_i64, ts, Quality::Good)
}

#[tokio::test]
async fn start_connects_then_subscribes_once() {
    let (mut module, historian, _sink) = module();
    module.initialize(MINIMAL_CONFIG).await.expect("initialize");
    assert_eq!(module.state(), ModuleState::Idle);

    module.start().await.expect("start");
    assert_eq!(module.state(), ModuleState::Streaming);
    assert_eq!(
        historian.calls(),
        vec![
            HistorianCall::Connect {
                host: "h".to_string()
            },
            HistorianCall::SetChangeHandler,
            HistorianCall::Subscribe {
                tag: "T1".to_string(),
                minimum_elapsed_ms: 1000
            },
        ]
    );
}

#[tokio::test]
async fn change_is_published_as_wire_payload() {
    let (mut module, historian, sink) = module();
    module.initialize(MINIMAL_CONFIG).await.expect("initialize");
    module.start().await.expect("start");

    assert!(historian.emit(vec![sample_change()]));
    let failures = module.stop().await;
    assert!(failures.is_empty());

    assert_eq!(
        sink.payloads(),
        vec![
            r#"[{"name":"Historian","content":[{"t":"T1","v":"1","dt":"2024-01-02 03:04:05","q":"good"}]}]"#
                .to_string()
        ]
    );
    let messages = sink.messages();
    assert_eq!(messages[0].properties.get("source"), Some("Proficy.Historian.Module"));
    assert_eq!(messages[0].properties.get("name"), Some("data"));
}

#[tokio::test]
async fn connection_failure_fails_and_tears_down() {
    let (mut module, historian, sink) = module();
    historian.fail_connect();
    historian.fail_drop_subscriptions();
    module.initialize(MINIMAL_CONFIG).await.expect("initialize");

    let err = module.start().await.expect_err("connect failure");
    assert!(matches!(err, ModuleError::Connection(_)));
    assert_eq!(module.state(), ModuleState::Failed);

    let calls = historian.calls();
    assert!(calls.contains(&HistorianCall::DropSubscriptions));
    assert!(calls.contains(&HistorianCall::Disconnect));
    assert!(!calls.iter().any(|call| matches!(call, HistorianCall::Subscribe { .. })));
    assert!(module.registry().is_empty());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn subscribe_failure_is_fatal() {
    let (mut module, historian, _sink) = module();
    historian.fail_subscribe("T2");
    module
        .initialize(
            br#"{"ServerName":"h","UserName":"u","Password":"p",
                "TagsToSubscribe":[{"TagName":"T1"},{"TagName":"T2"},{"TagName":"T3"}]}"#,
        )
        .await
        .expect("initialize");

    let err = module.start().await.expect_err("subscribe failure");
    assert!(matches!(err, ModuleError::Connection(_)));
    assert_eq!(module.state(), ModuleState::Failed);

    let calls = historian.calls();
    assert!(!calls.contains(&HistorianCall::Subscribe {
        tag: "T3".to_string(),
        minimum_elapsed_ms: 1000
    }));
    assert!(calls.ends_with(&[
        HistorianCall::DropSubscriptions,
        HistorianCall::ClearChangeHandler,
        HistorianCall::Disconnect,
    ]));
    assert!(!historian.emit(vec![sample_change()]));

    let failures = module.stop().await;
    assert!(failures.is_empty());
    assert_eq!(module.state(), ModuleState::Closed);
}

#[tokio::test]
async fn failed_start_leaves_nothing_for_stop() {
    let (mut module, historian, _sink) = module();
    historian.fail_connect();
    module.initialize(MINIMAL_CONFIG).await.expect("initialize");
    module.start().await.expect_err("connect failure");
    let calls = historian.calls();
    assert_eq!(
        calls
            .iter()
            .filter(|call| **call == HistorianCall::Disconnect)
            .count(),
        1
    );
    assert!(historian.handler().is_none());

    assert!(module.stop().await.is_empty());
    assert_eq!(historian.calls(), calls);
}

#[tokio::test]
async fn malformed_config_never_connects() {
    let (mut module, historian, _sink) = module();
    let err = module
        .initialize(br#"{"ServerName":"h","TagsToSubscribe":"#)
        .await
        .expect_err("malformed");
    assert!(matches!(err, ModuleError::Config(_)));
    assert_eq!(module.state(), ModuleState::Failed);
    assert!(historian.calls().is_empty());

    let err = module.start().await.expect_err("not startable");
    assert!(matches!(err, ModuleError::InvalidState { .. }));
}

#[tokio::test]
async fn start_requires_initialize() {
    let (mut module, historian, _sink) = module();
    let err = module.start().await.expect_err("uninitialized");
    assert!(matches!(
        err,
        ModuleError::InvalidState {
            operation: "start",
            state: ModuleState::Idle
        }
    ));
    assert!(historian.calls().is_empty());
}

#[tokio::test]
async fn stop_detaches_handler() {
    let (mut module, historian, sink) = module();
    module.initialize(MINIMAL_CONFIG).await.expect("initialize");
    module.start().await.expect("start");
    let retained = historian.handler().expect("handler registered");

    module.stop().await;
    assert_eq!(module.state(), ModuleState::Closed);

    assert!(!historian.emit(vec![sample_change()]));
    retained.on_change(vec![sample_change()]);
    tokio::task::yield_now().await;
    assert!(sink.is_empty());
}

#[tokio::test]
async fn teardown_attempts_every_step() {
    let (mut module, historian, _sink) = module();
    historian.fail_drop_subscriptions();
    historian.fail_clear_change_handler();
    historian.fail_disconnect();
    module.initialize(MINIMAL_CONFIG).await.expect("initialize");
    module.start().await.expect("start");

    let failures = module.stop().await;
    assert_eq!(failures.len(), 3);
    assert!(matches!(failures[0], TeardownError::DropSubscriptions(_)));
    assert!(matches!(failures[1], TeardownError::DetachHandler(_)));
    assert!(matches!(failures[2], TeardownError::Disconnect(_)));
    assert_eq!(module.state(), ModuleState::Closed);
    assert!(historian.calls().ends_with(&[
        HistorianCall::DropSubscriptions,
        HistorianCall::ClearChangeHandler,
        HistorianCall::Disconnect,
    ]));
}

#[tokio::test]
async fn stop_is_idempotent() {
    let (mut module, historian, _sink) = module();
    module.initialize(MINIMAL_CONFIG).await.expect("initialize");
    module.start().await.expect("start");
    module.stop().await;
    let calls = historian.calls().len();

    assert!(module.stop().await.is_empty());
    assert_eq!(historian.calls().len(), calls);
}

#[tokio::test]
async fn duplicate_tags_subscribe_once() {
    let (mut module, historian, _sink) = module();
    module
        .initialize(
            br#"{"ServerName":"h","UserName":"u","Password":"p",
                "TagsToSubscribe":[{"TagName":"T1"},{"TagName":"T1","MinimumElapsedMilliSeconds":200}]}"#,
        )
        .await
        .expect("initialize");
    module.start().await.expect("start");

    let subscribes: Vec<HistorianCall> = historian
        .calls()
        .into_iter()
        .filter(|call| matches!(call, HistorianCall::Subscribe { .. }))
        .collect();
    assert_eq!(
        subscribes,
        vec![HistorianCall::Subscribe {
            tag: "T1".to_string(),
            minimum_elapsed_ms: 200
        }]
    );
}

#[tokio::test]
async fn concurrent_notifications_are_all_published() {
    let (mut module, historian, sink) = module();
    module.initialize(MINIMAL_CONFIG).await.expect("initialize");
    module.start().await.expect("start");

    let threads: Vec<_> = (0..4)
        .map(|_| {
            let historian = historian.clone();
            std::thread::spawn(move || {
                for _ in 0..25 {
                    historian.emit(vec![sample_change()]);
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().expect("thread");
    }

    module.stop().await;
    assert_eq!(sink.len(), 100);
}

#[tokio::test]
async fn inbound_messages_are_ignored() {
    let (mut module, historian, sink) = module();
    module.initialize(MINIMAL_CONFIG).await.expect("initialize");
    let message = SinkMessage::new(
        "command",
        Arc::new(MessageProperties::routing("other", "command")),
    );
    module.receive(&message);

    assert_eq!(module.state(), ModuleState::Idle);
    assert!(historian.calls().is_empty());
    assert!(sink.is_empty());
}
