#![allow(dead_code)]

use std::sync::Once;

use cowdraft::{Config, Drafter, Value};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test subscriber once per binary. `RUST_LOG=cowdraft=trace`
/// shows scope and finalization events.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

/// One drafter per provider, tracking first.
pub fn both_providers() -> [Drafter; 2] {
    init_tracing();
    [
        Drafter::new(),
        Drafter::with_config(Config {
            use_proxies: false,
            ..Config::default()
        }),
    ]
}
