use super::*;
use crate::primitives::{ColorIntent, LogFormat};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("coffee").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_config_loading_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.log_level, 0);
    assert_eq!(config.concurrent_request_limit, 4);
    assert_eq!(config.color, ColorIntent::Auto);
}

#[test]
fn test_config_merging() {
    let base = AppConfig::default();
    let override_config = AppConfig {
        log_level: 4,
        color: ColorIntent::Always,
        concurrent_request_limit: 16,
        ..AppConfig::default()
    };

    let merged = base.merge_with(override_config);
    assert_eq!(merged.log_level, 4);
    assert_eq!(merged.color, ColorIntent::Always);
    assert_eq!(merged.concurrent_request_limit, 16);
    assert_eq!(merged.log_format, LogFormat::Text);
}

#[test]
fn test_environment_color_applies_under_cli_defaults() {
    let environment = EnvironmentConfig {
        no_color: Some("1".to_string()),
        ..EnvironmentConfig::default()
    };

    let loaded = CliConfig::from_cli(parse(&["version"]), &environment).unwrap();
    assert_eq!(loaded.app_config.color, ColorIntent::Never);
    assert!(matches!(loaded.command, Some(Commands::Version)));
}

#[test]
fn test_cli_color_flag_beats_environment() {
    let environment = EnvironmentConfig {
        no_color: Some("1".to_string()),
        ..EnvironmentConfig::default()
    };

    let loaded = CliConfig::from_cli(parse(&["--color", "always"]), &environment).unwrap();
    assert_eq!(loaded.app_config.color, ColorIntent::Always);
    assert!(loaded.command.is_none());
}

#[test]
fn test_zero_concurrency_rejected() {
    let err = CliConfig::from_cli(
        parse(&["--concurrent-request-limit", "0", "version"]),
        &EnvironmentConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ValidationFailed { .. }));
}
