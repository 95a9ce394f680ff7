//! Shared utilities for integration tests.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use exchange_router::{ExchangeKind, Router};

/// Build a set of queue names.
#[allow(dead_code)]
pub fn queues(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Router with one declared exchange and the given (queue, pattern) bindings.
#[allow(dead_code)]
pub fn router_with(exchange: &str, kind: ExchangeKind, bindings: &[(&str, &str)]) -> Router {
    let router = Router::new();
    router.declare_exchange(exchange, kind).unwrap();
    for (queue, pattern) in bindings {
        router.bind(exchange, queue, pattern).unwrap();
    }
    router
}

/// A unique file path under the system temp dir.
#[allow(dead_code)]
pub fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "exchange-router-{}-{}-{}",
        std::process::id(),
        nanos,
        name
    ))
}
