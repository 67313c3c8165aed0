// tests/config_load.rs
// Env-mutating tests run serially.
use serial_test::serial;
use std::io::Write;

use market_pulse::config::{DashboardConfig, InferenceConfig, SentimentMode};
use market_pulse::inference::providers::build_factory_from_config;

fn clear_env() {
    for k in [
        "DASHBOARD_CONFIG_PATH",
        "MARKET_PULSE_MAX_HOPS",
        "MARKET_PULSE_CHAR_BUDGET",
        "INFERENCE_CONFIG_PATH",
        "INFERENCE_TEST_MODE",
        "HF_API_TOKEN",
    ] {
        std::env::remove_var(k);
    }
}

fn write_tmp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f
}

#[test]
#[serial]
fn dashboard_file_and_env_overrides() {
    clear_env();
    let f = write_tmp(
        ".toml",
        r#"
        [feed]
        max_items = 12
        sentiment_mode = "deferred"
        [article]
        max_hops = 4
        char_budget = 900
        "#,
    );
    std::env::set_var("DASHBOARD_CONFIG_PATH", f.path());

    let cfg = DashboardConfig::load_default().unwrap();
    assert_eq!(cfg.feed.max_items, 12);
    assert_eq!(cfg.feed.sentiment_mode, SentimentMode::Deferred);
    assert_eq!(cfg.article.max_hops, 4);
    assert_eq!(cfg.article.char_budget, 900);

    std::env::set_var("MARKET_PULSE_MAX_HOPS", "7");
    std::env::set_var("MARKET_PULSE_CHAR_BUDGET", "not-a-number");
    let cfg = DashboardConfig::load_default().unwrap();
    assert_eq!(cfg.article.max_hops, 7);
    assert_eq!(cfg.article.char_budget, 900, "bad override is ignored");
    clear_env();
}

#[test]
#[serial]
fn explicit_missing_dashboard_path_is_an_error() {
    clear_env();
    std::env::set_var("DASHBOARD_CONFIG_PATH", "/definitely/not/here.toml");
    assert!(DashboardConfig::load_default().is_err());
    clear_env();
}

#[test]
#[serial]
fn malformed_dashboard_file_is_an_error() {
    clear_env();
    let f = write_tmp(".toml", "[feed\nmax_items = ");
    std::env::set_var("DASHBOARD_CONFIG_PATH", f.path());
    assert!(DashboardConfig::load_default().is_err());
    clear_env();
}

#[test]
#[serial]
fn inference_config_env_token() {
    clear_env();
    let hosted = r#"{"enabled": true, "provider": "hosted", "api_key": "ENV"}"#;
    assert!(InferenceConfig::from_json_str(hosted).is_err());

    std::env::set_var("HF_API_TOKEN", "hf_test_token");
    let cfg = InferenceConfig::from_json_str(hosted).unwrap();
    assert_eq!(cfg.api_key, "hf_test_token");
    clear_env();

    let local = r#"{"enabled": true, "provider": "local", "api_key": "ENV"}"#;
    assert!(InferenceConfig::from_json_str(local).unwrap().api_key.is_empty());
}

#[test]
#[serial]
fn inference_config_falls_back_to_local() {
    clear_env();
    let f = write_tmp(".json", "{ this is not json");
    std::env::set_var("INFERENCE_CONFIG_PATH", f.path());
    let cfg = InferenceConfig::load_default();
    assert_eq!(cfg.provider, "local");
    assert_eq!(build_factory_from_config(&cfg).name(), "local");

    let f = write_tmp(".json", r#"{"enabled": false}"#);
    std::env::set_var("INFERENCE_CONFIG_PATH", f.path());
    let cfg = InferenceConfig::load_default();
    assert!(!cfg.enabled);
    assert_eq!(build_factory_from_config(&cfg).name(), "disabled");

    std::env::set_var("INFERENCE_TEST_MODE", "mock");
    assert_eq!(build_factory_from_config(&cfg).name(), "mock");
    clear_env();
}
