use factsheet_service::{FactsheetError, SchemaProfile, ServiceConfig};
use std::collections::HashMap;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults_when_unset() {
    let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, ServiceConfig::default());
    assert_eq!(config.bind_addr.port(), 3000);
    assert_eq!(config.max_batches, 100);
    assert_eq!(config.batch_ttl_secs, 3600);
}

#[test]
fn test_overrides_from_environment() {
    let config = ServiceConfig::from_lookup(lookup(&[
        ("FACTSHEET_BIND_ADDR", "127.0.0.1:8080"),
        ("FACTSHEET_MAX_UPLOAD_BYTES", "2048"),
        ("FACTSHEET_PROFILE", "Extended"),
    ]))
    .unwrap();
    assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
    assert_eq!(config.max_upload_bytes, 2048);
    assert_eq!(config.default_profile, SchemaProfile::Extended);
}

#[test]
fn test_invalid_values_are_configuration_errors() {
    for pairs in [
        [("FACTSHEET_BIND_ADDR", "not-an-addr")],
        [("FACTSHEET_MAX_UPLOAD_BYTES", "-1")],
        [("FACTSHEET_PROFILE", "compact")],
        [("FACTSHEET_MAX_BATCHES", "0")],
        [("FACTSHEET_MAX_BATCHES", "many")],
        [("FACTSHEET_BATCH_TTL_SECS", "-5")],
    ] {
        let err = ServiceConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, FactsheetError::Configuration(_)), "{:?}", err);
    }
}

#[test]
fn test_batch_retention_overrides() {
    let config = ServiceConfig::from_lookup(lookup(&[
        ("FACTSHEET_MAX_BATCHES", "5"),
        ("FACTSHEET_BATCH_TTL_SECS", " 120 "),
    ]))
    .unwrap();
    assert_eq!(config.max_batches, 5);
    assert_eq!(config.batch_ttl_secs, 120);
}
