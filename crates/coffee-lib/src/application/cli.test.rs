use super::*;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("coffee").chain(args.iter().copied()))
}

#[test]
fn test_cli_definition_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}

#[test]
fn test_plan_arguments() {
    let cli = parse(&[
        "plan",
        "batch.yaml",
        "--existing",
        "RATE",
        "-e",
        "PRICE",
        "--levels",
        "--output",
        "json",
    ])
    .unwrap();

    match cli.command {
        Some(Commands::Plan {
            batch,
            levels,
            output,
        }) => {
            assert_eq!(batch.file, PathBuf::from("batch.yaml"));
            assert_eq!(batch.existing, vec!["RATE", "PRICE"]);
            assert!(batch.known_existing().contains("PRICE"));
            assert!(levels);
            assert_eq!(output, OutputFormat::Json);
        }
        other => panic!("expected plan command, got {other:?}"),
    }
}

#[test]
fn test_plan_defaults() {
    let cli = parse(&["plan", "batch.json"]).unwrap();
    match cli.command {
        Some(Commands::Plan { batch, levels, output }) => {
            assert!(batch.existing.is_empty());
            assert!(!levels);
            assert_eq!(output, OutputFormat::Text);
        }
        other => panic!("expected plan command, got {other:?}"),
    }
}

#[test]
fn test_simulate_failures_repeatable() {
    let cli = parse(&["simulate", "batch.toml", "--fail", "A", "--fail", "B"]).unwrap();
    match cli.command {
        Some(Commands::Simulate { fail, .. }) => assert_eq!(fail, vec!["A", "B"]),
        other => panic!("expected simulate command, got {other:?}"),
    }
}

#[test]
fn test_global_options_before_command() {
    let cli = parse(&["--log-level", "3", "-j", "8", "check", "batch.json"]).unwrap();
    assert_eq!(cli.config.log_level, 3);
    assert_eq!(cli.config.concurrent_request_limit, 8);
    assert!(matches!(cli.command, Some(Commands::Check { .. })));
}

#[test]
fn test_file_argument_required() {
    assert!(parse(&["plan"]).is_err());
    assert!(parse(&["split"]).is_err());
}

#[test]
fn test_no_command_is_allowed() {
    let cli = parse(&[]).unwrap();
    assert!(cli.command.is_none());
}
