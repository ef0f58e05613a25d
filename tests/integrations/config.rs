use formhook::cli::Cli;
use formhook::config::Config;
use formhook::DeliveryMode;
use serial_test::serial;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

fn config_file(toml_content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", toml_content).unwrap();
    file
}

#[test]
#[serial]
fn test_load_full_valid_config() {
    let file = config_file(
        r#"
        log_level = "debug"
        [server]
        listen_address = "0.0.0.0:9090"
        [delivery]
        mode = "parallel"
        timeout_ms = 2500
        [storage]
        data_dir = "/var/lib/formhook"
        [metrics]
        enabled = true
    "#,
    );

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = Config::load(&cli).unwrap();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.server.listen_address, "0.0.0.0:9090");
    assert_eq!(config.delivery.mode, DeliveryMode::Parallel);
    assert_eq!(config.delivery.timeout(), Some(Duration::from_millis(2500)));
    assert_eq!(
        config.storage.data_dir,
        Some(PathBuf::from("/var/lib/formhook"))
    );
    assert!(config.metrics.enabled);
}

#[test]
#[serial]
fn test_load_default_values() {
    let file = config_file("");
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };

    let config = Config::load(&cli).unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.delivery.mode, DeliveryMode::Sequential);
    assert_eq!(config.delivery.timeout(), None);
    assert!(config.storage.data_dir.is_none());
}

#[test]
#[serial]
fn test_cli_overrides_file() {
    let file = config_file(
        r#"
        [server]
        listen_address = "0.0.0.0:9090"
        [delivery]
        mode = "sequential"
        timeout_ms = 1000
    "#,
    );

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        listen: Some("127.0.0.1:7000".to_string()),
        delivery_mode: Some(DeliveryMode::Parallel),
        data_dir: Some(PathBuf::from("/tmp/formhook")),
        metrics: true,
        ..Default::default()
    };
    let config = Config::load(&cli).unwrap();

    assert_eq!(config.server.listen_address, "127.0.0.1:7000");
    assert_eq!(config.delivery.mode, DeliveryMode::Parallel);
    // Untouched by the CLI, so the file value survives the merge.
    assert_eq!(config.delivery.timeout_ms, Some(1000));
    assert_eq!(config.storage.data_dir, Some(PathBuf::from("/tmp/formhook")));
    assert!(config.metrics.enabled);
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let file = config_file(
        r#"
        [delivery]
        mode = "sequential"
    "#,
    );
    std::env::set_var("FORMHOOK_DELIVERY__MODE", "parallel");

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = Config::load(&cli);
    std::env::remove_var("FORMHOOK_DELIVERY__MODE");

    assert_eq!(config.unwrap().delivery.mode, DeliveryMode::Parallel);
}

#[test]
#[serial]
fn test_invalid_value_type() {
    let file = config_file(
        r#"
        [delivery]
        timeout_ms = "fast"
    "#,
    );
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };

    assert!(Config::load(&cli).is_err());
}

#[test]
#[serial]
fn test_unknown_delivery_mode_is_rejected() {
    let file = config_file(
        r#"
        [delivery]
        mode = "eventually"
    "#,
    );
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };

    assert!(Config::load(&cli).is_err());
}
