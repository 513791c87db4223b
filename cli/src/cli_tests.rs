//! Tests for CLI parsing and default behaviours.

use super::*;
use clap::CommandFactory;
use rstest::rstest;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["jarshade"]);
    assert!(cli.command.is_none());
    assert_eq!(cli.build.manifest, Utf8PathBuf::from("jarshade.toml"));
    assert!(cli.build.output_dir.is_none());
    assert!(cli.build.module.is_empty());
    assert!(cli.build.jobs.is_none());
    assert!(!cli.build.strict);
    assert!(!cli.build.dry_run);
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
}

#[test]
fn bare_invocation_builds() {
    let cli = Cli::parse_from(["jarshade", "-m", "sub/jarshade.toml", "--dry-run"]);
    match cli.into_command() {
        Command::Build(args) => {
            assert_eq!(args.manifest, Utf8PathBuf::from("sub/jarshade.toml"));
            assert!(args.dry_run);
        }
        Command::Resolve(_) => panic!("expected Build command"),
    }
}

#[test]
fn cli_parses_build_subcommand_with_args() {
    let cli = Cli::parse_from([
        "jarshade", "build", "-o", "dist", "--module", "app", "--module", "lib", "-j", "4",
        "--strict",
    ]);
    match cli.into_command() {
        Command::Build(args) => {
            assert_eq!(args.output_dir, Some(Utf8PathBuf::from("dist")));
            assert_eq!(args.module, vec!["app".to_owned(), "lib".to_owned()]);
            assert_eq!(args.jobs, Some(4));
            assert!(args.strict);
        }
        Command::Resolve(_) => panic!("expected Build command"),
    }
}

#[test]
fn cli_parses_resolve_subcommand() {
    let cli = Cli::parse_from([
        "jarshade",
        "resolve",
        "--module",
        "app",
        "--classpath",
        "test-runtime",
        "--json",
    ]);
    match cli.into_command() {
        Command::Resolve(args) => {
            assert_eq!(args.module.as_deref(), Some("app"));
            assert_eq!(args.classpath, Some(ClasspathArg::TestRuntime));
            assert!(args.json);
            assert_eq!(args.manifest, Utf8PathBuf::from("jarshade.toml"));
        }
        Command::Build(_) => panic!("expected Resolve command"),
    }
}

#[rstest]
#[case::runtime(ClasspathArg::Runtime, Classpath::Runtime)]
#[case::compile(ClasspathArg::Compile, Classpath::Compile)]
#[case::test_runtime(ClasspathArg::TestRuntime, Classpath::TestRuntime)]
fn classpath_args_map_to_classpaths(#[case] arg: ClasspathArg, #[case] expected: Classpath) {
    assert_eq!(Classpath::from(arg), expected);
}

#[rstest]
#[case::quiet(&["jarshade", "-q"], LevelFilter::Error)]
#[case::default(&["jarshade"], LevelFilter::Warn)]
#[case::verbose(&["jarshade", "-v"], LevelFilter::Info)]
#[case::debug(&["jarshade", "-vv"], LevelFilter::Debug)]
#[case::trace(&["jarshade", "-vvvv"], LevelFilter::Trace)]
#[case::after_subcommand(&["jarshade", "resolve", "-vv"], LevelFilter::Debug)]
fn verbosity_maps_to_log_level(#[case] args: &[&str], #[case] expected: LevelFilter) {
    assert_eq!(Cli::parse_from(args.iter().copied()).log_level(), expected);
}

#[test]
fn quiet_conflicts_with_verbose() {
    assert!(Cli::try_parse_from(["jarshade", "-q", "-v"]).is_err());
}

#[rstest]
#[case::zero("0")]
#[case::negative("-2")]
#[case::word("many")]
fn invalid_job_counts_are_rejected(#[case] jobs: &str) {
    assert!(Cli::try_parse_from(["jarshade", "--jobs", jobs]).is_err());
}

#[test]
fn unknown_classpaths_are_rejected() {
    assert!(Cli::try_parse_from(["jarshade", "resolve", "--classpath", "annotation"]).is_err());
}

#[test]
fn build_args_default_to_the_standard_manifest() {
    let args = BuildArgs::default();
    assert_eq!(args.manifest, Utf8PathBuf::from(DEFAULT_MANIFEST));
    assert!(args.module.is_empty());
}
