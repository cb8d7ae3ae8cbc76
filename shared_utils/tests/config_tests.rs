use shared_utils::config::{BootstrapConfig, ConfigError};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_load_full_config() {
    let mut file = NamedTempFile::new().unwrap();

    let config_str = r#"
        log_level = "debug"

        [vpn]
        binary = "/usr/sbin/openvpn"
        profile_path = "/app/vpn/in.ovpn"
        auth_file = "/run/vpn/auth"
        daemon_flag = "--daemon"
        extra_args = ["--verb", "3"]

        [readiness]
        interface = "tun1"
        max_attempts = 10
        interval_secs = 2
        require_tunnel = true

        [scraper]
        program = "python"
        args = ["main.py"]
        required_env = ["TELEGRAM_BOT_TOKEN"]
    "#;

    file.write_all(config_str.as_bytes()).unwrap();

    let config = BootstrapConfig::load(file.path()).unwrap();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.vpn.binary, "/usr/sbin/openvpn");
    assert_eq!(config.vpn.profile_path, PathBuf::from("/app/vpn/in.ovpn"));
    assert_eq!(config.vpn.auth_file, PathBuf::from("/run/vpn/auth"));
    assert_eq!(config.vpn.extra_args, vec!["--verb", "3"]);
    assert_eq!(config.readiness.interface, "tun1");
    assert_eq!(config.readiness.max_attempts, 10);
    assert_eq!(config.readiness.interval(), Duration::from_secs(2));
    assert!(config.readiness.require_tunnel);
    assert_eq!(config.scraper.program, "python");
    assert_eq!(config.scraper.required_env, vec!["TELEGRAM_BOT_TOKEN"]);
}

#[test]
fn test_empty_file_yields_defaults() {
    let file = NamedTempFile::new().unwrap();

    let config = BootstrapConfig::load(file.path()).unwrap();

    assert_eq!(config.vpn.binary, "openvpn");
    assert_eq!(config.readiness.interface, "tun0");
    assert_eq!(config.readiness.max_attempts, 25);
    assert_eq!(config.readiness.interval_secs, 1);
    assert!(!config.readiness.require_tunnel);
    assert_eq!(config.scraper.program, "python3");
}

#[test]
fn test_invalid_toml() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[readiness\ninterface = ").unwrap();

    let result = BootstrapConfig::load(file.path());
    assert!(matches!(result, Err(ConfigError::TomlError(_))));
}

#[test]
fn test_empty_interface_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[readiness]\ninterface = \"\"\n").unwrap();

    match BootstrapConfig::load(file.path()) {
        Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "readiness.interface"),
        other => panic!("Expected InvalidValue for readiness.interface, got {:?}", other),
    }
}

#[test]
fn test_empty_program_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"[scraper]\nprogram = \" \"\n").unwrap();

    match BootstrapConfig::load(file.path()) {
        Err(ConfigError::MissingValue(msg)) => assert!(msg.contains("scraper.program")),
        other => panic!("Expected MissingValue for scraper.program, got {:?}", other),
    }
}

#[test]
fn test_zero_interval_rejected() {
    let result = BootstrapConfig::from_toml_str("[readiness]\ninterval_secs = 0\n");
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_explicit_missing_path() {
    let path = PathBuf::from("/definitely/not/here/bootstrap.toml");
    match BootstrapConfig::load_or_default(Some(path.as_path())) {
        Err(ConfigError::FileNotFound(p)) => assert_eq!(p, path),
        other => panic!("Expected FileNotFound, got {:?}", other),
    }
}
