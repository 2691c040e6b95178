use super::*;

#[test]
fn test_filter_directives_scope_own_crates() {
    assert_eq!(
        filter_directives(LogLevel::Debug),
        "coffee_lib=debug,coffee=debug,tokio=warn,warn"
    );
}

#[test]
fn test_filter_directives_never_louder_than_requested() {
    assert_eq!(
        filter_directives(LogLevel::Error),
        "coffee_lib=error,coffee=error,tokio=warn,error"
    );
}

#[test]
fn test_filter_directives_parse() {
    for level in [LogLevel::Error, LogLevel::Info, LogLevel::Trace] {
        assert!(EnvFilter::try_new(filter_directives(level)).is_ok());
    }
}

#[test]
fn test_progress_span_macro_builds_span() {
    let span = crate::progress_span!("create", total = 3usize);
    // No subscriber is installed in unit tests, so the span is disabled
    assert!(span.is_disabled() || span.metadata().is_some());
}

#[test]
fn test_global_logger_consistent() {
    assert_eq!(Logger::is_initialized(), Logger::global().is_some());
}
