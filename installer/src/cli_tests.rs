//! Tests for installer CLI parsing and default behaviours.

use super::*;
use rstest::rstest;

#[test]
fn cli_parses_defaults() {
    let cli = Cli::parse_from(["mockie-installer"]);
    assert_eq!(cli, Cli::default());
}

#[test]
fn cli_parses_directories() {
    let cli = Cli::parse_from([
        "mockie-installer",
        "--project-dir",
        "/src/mockie",
        "-i",
        "/opt/bin",
    ]);
    assert_eq!(cli.project_dir, Some(Utf8PathBuf::from("/src/mockie")));
    assert_eq!(cli.install_dir, Some(Utf8PathBuf::from("/opt/bin")));
}

#[test]
fn cli_parses_skip_flags() {
    let cli = Cli::parse_from([
        "mockie-installer",
        "--skip-build",
        "--skip-path",
        "--skip-verify",
        "--dry-run",
    ]);
    assert!(cli.skip_build);
    assert!(cli.skip_path);
    assert!(cli.skip_verify);
    assert!(cli.dry_run);
}

#[test]
fn cli_rejects_quiet_with_verbose() {
    let result = Cli::try_parse_from(["mockie-installer", "-q", "-v"]);
    assert!(result.is_err());
}

#[rstest]
#[case::default(&["mockie-installer"][..], log::LevelFilter::Warn)]
#[case::verbose(&["mockie-installer", "-v"][..], log::LevelFilter::Info)]
#[case::very_verbose(&["mockie-installer", "-vvv"][..], log::LevelFilter::Trace)]
#[case::quiet(&["mockie-installer", "--quiet"][..], log::LevelFilter::Error)]
fn log_level_follows_flags(#[case] args: &[&str], #[case] expected: log::LevelFilter) {
    let cli = Cli::parse_from(args);
    assert_eq!(cli.log_level(), expected);
}
