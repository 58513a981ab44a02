#![cfg(feature = "serde")]

use cmdguard::{BucketScope, ConcurrencyConfig, CooldownBucket, CooldownConfig, OnLimit};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct CommandSettings {
    cooldown: CooldownConfig,
    #[serde(default)]
    scope: BucketScope,
    concurrency: Option<ConcurrencyConfig>,
}

#[test]
fn command_settings_load_from_json() {
    let settings: CommandSettings = serde_json::from_str(
        r#"{
            "cooldown": { "window_secs": 2.5, "max_uses": 3 },
            "scope": "guild",
            "concurrency": { "max_concurrent": 2, "mode": "reject" }
        }"#,
    )
    .expect("valid settings");

    assert_eq!(settings.cooldown.window(), Duration::from_millis(2_500));
    assert_eq!(settings.cooldown.max_uses(), 3);
    assert_eq!(settings.scope, BucketScope::Guild);
    let concurrency = settings.concurrency.expect("concurrency configured");
    assert_eq!(concurrency.max_concurrent(), 2);
    assert_eq!(concurrency.mode(), OnLimit::Reject);

    let bucket = CooldownBucket::<u64>::from_config(settings.cooldown);
    assert_eq!(bucket.max_uses(), 3);
}

#[test]
fn defaults_apply_to_optional_fields() {
    let settings: CommandSettings =
        serde_json::from_str(r#"{ "cooldown": { "window_secs": 60, "max_uses": 1 } }"#)
            .expect("minimal settings");
    assert_eq!(settings.scope, BucketScope::User);
    assert!(settings.concurrency.is_none());

    let concurrency: ConcurrencyConfig =
        serde_json::from_str(r#"{ "max_concurrent": 1 }"#).expect("mode defaults");
    assert_eq!(concurrency.mode(), OnLimit::Wait);
}

#[test]
fn invalid_values_are_rejected_at_load_time() {
    let err = serde_json::from_str::<CooldownConfig>(r#"{ "window_secs": 0, "max_uses": 1 }"#)
        .expect_err("zero window");
    assert!(err.to_string().contains("window_seconds must be positive"), "{err}");

    let err = serde_json::from_str::<CooldownConfig>(r#"{ "window_secs": 5, "max_uses": 0 }"#)
        .expect_err("zero uses");
    assert!(err.to_string().contains("max_uses must be >= 1"), "{err}");

    let err = serde_json::from_str::<ConcurrencyConfig>(r#"{ "max_concurrent": 0 }"#)
        .expect_err("zero limit");
    assert!(err.to_string().contains("max_concurrent must be >= 1"), "{err}");
}

#[test]
fn configs_serialize_to_the_same_shape() {
    let cooldown = CooldownConfig::new(Duration::from_secs(10), 2).expect("valid");
    assert_eq!(
        serde_json::to_value(cooldown).expect("serializable"),
        serde_json::json!({ "window_secs": 10.0, "max_uses": 2 })
    );
}
