//! Config file loading through the full pipeline

use std::io::Write;
use tessera_core::config::SigningConfig;
use tessera_core::{ConfigLoader, ConfigValidation, TesseraConfig};

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[threshold]
threshold = 2

[[threshold.key_servers]]
id = "0x1"
weight = 2

[[threshold.key_servers]]
id = "0x2"
url = "https://ks2.example"

[pool]
request_timeout_ms = 250
quorum_timeout_ms = 500
max_invalid_shares = 0

[storage]
epochs = 5
deletable = true
signing = {{ mode = "server_managed", keypair = "AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE=" }}
"#
    )
    .unwrap();

    let config = TesseraConfig::load_from_file(file.path()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.threshold.key_servers.len(), 2);
    assert_eq!(config.threshold.key_servers[0].weight, 2);
    assert_eq!(config.threshold.key_servers[1].weight, 1);
    assert_eq!(config.threshold.total_weight(), 3);
    assert_eq!(config.pool.max_invalid_shares, 0);
    assert!(matches!(
        config.storage.signing,
        SigningConfig::ServerManaged { .. }
    ));
    assert_eq!(
        config.storage.signing.server_secret_key().unwrap(),
        Some([1u8; 32])
    );
}

#[test]
fn test_missing_file_is_reported() {
    let err = TesseraConfig::load_from_file(std::path::Path::new("/nonexistent/tessera.toml"))
        .unwrap_err();
    assert!(err.to_string().contains("failed to read config"));
}

#[test]
fn test_malformed_toml_is_invalid() {
    let err = TesseraConfig::from_toml_str("[threshold\nthreshold = ").unwrap_err();
    assert_eq!(err.kind(), tessera_core::ErrorKind::Invalid);
}
