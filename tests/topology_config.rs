//! Loading topologies from disk and swapping them into a live router.

use std::fs;
use std::path::Path;

use exchange_router::config::{load_config, ConfigError};
use exchange_router::message::RETRY_COUNT_HEADER;
use exchange_router::resilience::{FailureKind, RetryDecision, RetryPolicy};
use exchange_router::{ExchangeKind, Message, Router, RoutingError, TopologyConfig};

mod common;
use common::{queues, temp_path};

fn bundled_topology() -> TopologyConfig {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("topology.toml");
    load_config(&path).unwrap()
}

#[test]
fn test_bundled_topology_routes() {
    let router = Router::from_config(&bundled_topology()).unwrap();

    assert_eq!(
        router.route("topic_logs", "auth.error.database").unwrap(),
        queues(&["database_watch", "error_handler", "log_aggregator", "security_monitor"])
    );
    assert_eq!(
        router.route("topic_logs", "order.critical.inventory").unwrap(),
        queues(&["log_aggregator", "security_monitor"])
    );
    assert_eq!(
        router.route("direct_logs", "error").unwrap(),
        queues(&["audit", "error_handler"])
    );
    assert!(router.route("direct_logs", "info").unwrap().is_empty());
    assert_eq!(
        router.route("broadcast_news", "ignored").unwrap(),
        queues(&["email", "sms"])
    );
}

#[test]
fn test_invalid_file_reports_every_problem() {
    let path = temp_path("invalid.toml");
    fs::write(
        &path,
        r#"
        [[exchanges]]
        name = "tasks"
        kind = "direct"

        [[bindings]]
        exchange = "tasks"
        queue = "q"
        pattern = "error.*"

        [[bindings]]
        exchange = "missing"
        queue = "q"
        "#,
    )
    .unwrap();

    let result = load_config(&path);
    fs::remove_file(&path).unwrap_or_default();

    match result {
        Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
        other => panic!("expected validation failure, got {:?}", other),
    }
}

#[test]
fn test_apply_config_replaces_table() {
    let router = Router::from_config(&bundled_topology()).unwrap();
    router.declare_exchange("adhoc", ExchangeKind::Fanout).unwrap();

    let path = temp_path("reload.toml");
    fs::write(
        &path,
        r#"
        [[exchanges]]
        name = "topic_logs"
        kind = "topic"

        [[bindings]]
        exchange = "topic_logs"
        queue = "payments"
        pattern = "payment.#"
        "#,
    )
    .unwrap();
    let reloaded = load_config(&path);
    fs::remove_file(&path).unwrap_or_default();

    router.apply_config(&reloaded.unwrap()).unwrap();

    assert_eq!(
        router.route("topic_logs", "payment.warning.gateway").unwrap(),
        queues(&["payments"])
    );
    assert!(router.route("topic_logs", "auth.error.database").unwrap().is_empty());
    assert!(matches!(
        router.route("adhoc", ""),
        Err(RoutingError::UnknownExchange { .. })
    ));
}

#[test]
fn test_retry_flow_through_router() {
    let config = bundled_topology();
    let router = Router::from_config(&config).unwrap();
    let policy = RetryPolicy::new(config.retry.clone());
    policy.install(&router, "direct_logs").unwrap();

    let mut message = Message::new("error", "temporary_error");
    for expected_attempt in 1..=config.retry.max_attempts {
        match policy.plan("direct_logs", &message, FailureKind::Transient) {
            decision @ RetryDecision::Retry { .. } => {
                policy.bind_holding_queue(&router, &decision).unwrap();
                assert_eq!(decision.exchange(), "direct_logs_retry");
                assert_eq!(
                    router
                        .route_message(decision.exchange(), decision.message())
                        .unwrap(),
                    queues(&[format!("retry_queue_{}s", 1u64 << (expected_attempt - 1)).as_str()])
                );

                let RetryDecision::Retry {
                    attempt,
                    return_exchange,
                    message: retried,
                    ..
                } = decision
                else {
                    unreachable!()
                };
                assert_eq!(attempt, expected_attempt);
                // Once the delay expires the message is redelivered to the source exchange.
                let redelivered = retried.for_redelivery();
                assert_eq!(
                    router.route_message(&return_exchange, &redelivered).unwrap(),
                    queues(&["audit", "error_handler"])
                );
                message = redelivered;
            }
            other => panic!("expected retry, got {:?}", other),
        }
    }
    assert!(router.route("direct_logs_retry", "error").unwrap().is_empty());
    assert_eq!(message.retry_count(), 3);

    let decision = policy.plan("direct_logs", &message, FailureKind::Transient);
    assert!(matches!(decision, RetryDecision::DeadLetter { .. }));
    assert_eq!(
        router
            .route_message(decision.exchange(), decision.message())
            .unwrap(),
        queues(&["dead_letter_queue"])
    );
    assert_eq!(
        decision.message().header(RETRY_COUNT_HEADER),
        Some(&serde_json::Value::from(3u32))
    );
}
