use super::*;

fn env_of(pairs: &[(&str, &str)]) -> EnvironmentConfig {
    EnvironmentConfig::from_vars(
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string())),
    )
    .unwrap()
}

#[test]
fn test_unrelated_variables_ignored() {
    let env = env_of(&[("NO_COLOR", "1"), ("UNRELATED", "x")]);
    assert_eq!(env.no_color.as_deref(), Some("1"));
    assert!(env.force_color.is_none());
}

#[test]
fn test_no_color_environment_variable() {
    let env = env_of(&[("NO_COLOR", "1")]);
    assert_eq!(env.apply_color_config(ColorIntent::Auto), ColorIntent::Never);
}

#[test]
fn test_force_color_environment_variable() {
    let env = env_of(&[("FORCE_COLOR", "1")]);
    assert_eq!(env.apply_color_config(ColorIntent::Auto), ColorIntent::Always);
}

#[test]
fn test_environment_variable_precedence() {
    let env = env_of(&[("CLICOLOR", "0"), ("NO_COLOR", "1"), ("FORCE_COLOR", "1")]);
    assert_eq!(env.apply_color_config(ColorIntent::Auto), ColorIntent::Always);
}

#[test]
fn test_ci_environment_variable() {
    let env = env_of(&[("CI", "true")]);
    assert_eq!(env.apply_color_config(ColorIntent::Always), ColorIntent::Never);
}

#[test]
fn test_force_color_overrides_ci() {
    let env = env_of(&[("CI", "true"), ("FORCE_COLOR", "1")]);
    assert_eq!(env.apply_color_config(ColorIntent::Auto), ColorIntent::Always);
}

#[test]
fn test_ci_switched_off_keeps_colour() {
    for value in ["0", "false", ""] {
        let env = env_of(&[("CI", value)]);
        assert_eq!(env.apply_color_config(ColorIntent::Auto), ColorIntent::Auto, "CI={value:?}");
    }
}

#[test]
fn test_clicolor_zero_disables() {
    let env = env_of(&[("CLICOLOR", "0")]);
    assert_eq!(env.apply_color_config(ColorIntent::Always), ColorIntent::Never);
}

#[test]
fn test_empty_no_color_is_ignored() {
    let env = env_of(&[("NO_COLOR", "")]);
    assert_eq!(env.apply_color_config(ColorIntent::Auto), ColorIntent::Auto);
}

#[test]
fn test_invalid_force_color_values_ignored() {
    let env = env_of(&[("FORCE_COLOR", "invalid")]);
    assert_eq!(env.apply_color_config(ColorIntent::Auto), ColorIntent::Auto);
}
