use clap::Parser;
use coffee_lib::application::{Cli, CliConfig, EnvironmentConfig};
use coffee_lib::primitives::{ColorIntent, ConfigError, LogFormat, LogLevel, LogOutput};

fn load(args: &[&str], environment: &EnvironmentConfig) -> Result<CliConfig, ConfigError> {
    let cli = Cli::try_parse_from(std::iter::once("coffee").chain(args.iter().copied()))
        .map_err(|e| ConfigError::ParseError {
            value: args.join(" "),
            reason: e.to_string(),
        })?;
    CliConfig::from_cli(cli, environment)
}

#[test]
fn test_config_default_creation() {
    let loaded = load(&[], &EnvironmentConfig::default()).unwrap();
    let config = loaded.app_config;

    assert!(config.log_level <= 4);
    assert_eq!(config.concurrent_request_limit, 4);
    assert_eq!(config.color, ColorIntent::Auto);
    assert!(loaded.command.is_none());
}

#[test]
fn test_logger_config_follows_flags() {
    let loaded = load(
        &[
            "--log-level",
            "2",
            "--log-format",
            "json",
            "--log-output",
            "stdout",
            "--color",
            "never",
            "version",
        ],
        &EnvironmentConfig::default(),
    )
    .unwrap();

    let logger = loaded.app_config.to_logger_config();
    assert_eq!(logger.level, LogLevel::Info);
    assert_eq!(logger.format, LogFormat::Json);
    assert_eq!(logger.output, LogOutput::Stdout);
    assert!(!logger.color);
}

#[test]
fn test_forced_color_reaches_logger() {
    let environment = EnvironmentConfig {
        force_color: Some("1".to_string()),
        ..EnvironmentConfig::default()
    };
    let loaded = load(&["version"], &environment).unwrap();
    assert!(loaded.app_config.to_logger_config().color);
}

#[test]
fn test_invalid_flag_value_is_parse_error() {
    let err = load(&["--color", "sometimes"], &EnvironmentConfig::default()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
}
