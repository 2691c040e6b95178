use super::*;

macro_rules! test_enum_completeness {
    ($enum_type:ty, $test_name:ident) => {
        #[test]
        fn $test_name() {
            for variant in <$enum_type>::value_variants() {
                let possible_value = variant
                    .to_possible_value()
                    .expect("PossibleValue should exist for all variants");

                let primary_name = possible_value.get_name();
                let parsed: $enum_type = primary_name
                    .parse()
                    .unwrap_or_else(|_| panic!("'{}' should parse", primary_name));
                assert_eq!(parsed, *variant, "Round-trip should preserve variant");
            }
        }
    };
}

macro_rules! test_fromstr_aliases {
    ($enum_type:ty, $test_name:ident, $expected_mappings:expr) => {
        #[test]
        fn $test_name() {
            let mappings: &[(&str, $enum_type)] = &$expected_mappings;

            for (input, expected) in mappings {
                let parsed: Result<$enum_type, _> = input.parse();
                assert_eq!(
                    parsed.ok(),
                    Some(*expected),
                    "Wrong variant for input '{}'",
                    input
                );
            }
        }
    };
}

test_enum_completeness!(LogLevel, test_log_level_completeness);
test_enum_completeness!(LogFormat, test_log_format_completeness);
test_enum_completeness!(LogOutput, test_log_output_completeness);
test_enum_completeness!(ColorIntent, test_color_intent_completeness);

test_fromstr_aliases!(
    LogLevel,
    test_log_level_aliases,
    [
        ("error", LogLevel::Error),
        ("err", LogLevel::Error),
        ("fatal", LogLevel::Error),
        ("warn", LogLevel::Warning),
        ("warning", LogLevel::Warning),
        ("info", LogLevel::Info),
        ("debug", LogLevel::Debug),
        ("trace", LogLevel::Trace),
        ("verbose", LogLevel::Trace),
    ]
);

test_fromstr_aliases!(
    LogFormat,
    test_log_format_aliases,
    [
        ("text", LogFormat::Text),
        ("txt", LogFormat::Text),
        ("plain", LogFormat::Text),
        ("json", LogFormat::Json),
        ("yaml", LogFormat::Yaml),
        ("yml", LogFormat::Yaml),
        ("pretty", LogFormat::Yaml),
    ]
);

test_fromstr_aliases!(
    ColorIntent,
    test_color_intent_aliases,
    [
        ("auto", ColorIntent::Auto),
        ("detect", ColorIntent::Auto),
        ("always", ColorIntent::Always),
        ("force", ColorIntent::Always),
        ("on", ColorIntent::Always),
        ("never", ColorIntent::Never),
        ("off", ColorIntent::Never),
    ]
);

#[test]
fn test_unknown_value_reports_reason() {
    let err = "sometimes".parse::<ColorIntent>().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to parse configuration value 'sometimes': invalid color intent"
    );
}

#[test]
fn test_log_level_from_verbosity_boundary_conditions() {
    assert_eq!(LogLevel::from_verbosity(0), LogLevel::Error);
    assert_eq!(LogLevel::from_verbosity(1), LogLevel::Warning);
    assert_eq!(LogLevel::from_verbosity(2), LogLevel::Info);
    assert_eq!(LogLevel::from_verbosity(3), LogLevel::Debug);
    assert_eq!(LogLevel::from_verbosity(4), LogLevel::Trace);
    assert_eq!(LogLevel::from_verbosity(u8::MAX), LogLevel::Trace);
}

#[test]
fn test_log_level_should_log_matrix() {
    let levels = [
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    for (i, message_level) in levels.iter().enumerate() {
        for (j, current_level) in levels.iter().enumerate() {
            assert_eq!(message_level.should_log(*current_level), i <= j);
        }
    }
}

#[test]
fn test_log_level_filter_directives() {
    assert_eq!(LogLevel::Warning.as_filter(), "warn");
    assert_eq!(LogLevel::Trace.as_filter(), "trace");
}

#[test]
fn test_color_intent_resolution() {
    assert!(ColorIntent::Auto.resolve(true));
    assert!(!ColorIntent::Auto.resolve(false));
    assert!(ColorIntent::Always.resolve(false));
    assert!(!ColorIntent::Never.resolve(true));
}

#[test]
fn test_config_error_display() {
    assert_eq!(
        ConfigError::AlreadyInitialized.to_string(),
        "Global configuration already initialized"
    );
    assert_eq!(
        ConfigError::ValidationFailed {
            reason: "concurrent request limit must be greater than 0".to_string()
        }
        .to_string(),
        "Configuration validation failed: concurrent request limit must be greater than 0"
    );
}
