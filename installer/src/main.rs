//! mockie installer CLI entrypoint.
//!
//! Builds mockie in release mode, installs the executable for the current
//! platform, registers its directory on the user's PATH and checks that the
//! command runs. Status text goes to stderr; logs go through `env_logger`.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::debug;
use mockie_installer::builder::BuildConfig;
use mockie_installer::cli::Cli;
use mockie_installer::command::SystemCommandExecutor;
use mockie_installer::dirs::{BaseDirs, SystemBaseDirs};
use mockie_installer::error::{InstallerError, Result};
use mockie_installer::install::SystemInstallFs;
use mockie_installer::output::{DryRunInfo, write_stderr_line};
use mockie_installer::pipeline::{InstallContext, InstallOptions, InstallReport, Orchestrator};
use mockie_installer::platform::Platform;
use mockie_installer::registrar::{FsProfileStore, RegistryPathStore};
use mockie_installer::resolution::resolve_with_override;
use mockie_installer::verify::dir_in_search_path;
use std::io::{self, Write};

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stderr = io::stderr();
    let run_result = run(&cli, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// `RUST_LOG` takes precedence over the `-v`/`-q` flags.
fn init_logging(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();
}

fn run(cli: &Cli, stderr: &mut dyn Write) -> Result<()> {
    let cwd = current_dir()?;
    let project_dir = resolve_project_dir(&cwd, cli.project_dir.as_deref());
    let target_dir = std::env::var("CARGO_TARGET_DIR").ok();
    let build = BuildConfig::with_target_override(&project_dir, target_dir.as_deref());
    let dirs = SystemBaseDirs;

    if cli.dry_run {
        return run_dry(cli, Platform::detect()?, &build, &dirs, stderr);
    }

    // cargo builds the package in the working directory.
    std::env::set_current_dir(&project_dir)?;
    debug!("working directory set to {project_dir}");

    let executor = SystemCommandExecutor;
    let user_path = RegistryPathStore::new(&executor);
    let context = InstallContext {
        executor: &executor,
        dirs: &dirs,
        user_path: &user_path,
        profiles: &FsProfileStore,
        files: &SystemInstallFs,
    };
    let mut orchestrator = Orchestrator::new(context, options_for_cli(cli, build));
    let report = orchestrator.run(std::env::consts::OS, stderr)?;

    if !cli.quiet {
        let search_path = std::env::var_os("PATH");
        report_search_path(&report, search_path.as_deref(), stderr);
    }
    Ok(())
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::try_from(cwd).map_err(|e| InstallerError::Io(e.into_io_error()))
}

/// Resolve the project directory against the working directory.
fn resolve_project_dir(cwd: &Utf8Path, requested: Option<&Utf8Path>) -> Utf8PathBuf {
    match requested {
        Some(dir) if dir.is_absolute() => dir.to_owned(),
        Some(dir) => cwd.join(dir),
        None => cwd.to_owned(),
    }
}

fn options_for_cli(cli: &Cli, build: BuildConfig) -> InstallOptions {
    InstallOptions {
        install_dir: cli.install_dir.clone(),
        skip_build: cli.skip_build,
        skip_path: cli.skip_path,
        skip_verify: cli.skip_verify,
        quiet: cli.quiet,
        ..InstallOptions::new(build)
    }
}

/// Shows the resolved plan without side effects.
fn run_dry(
    cli: &Cli,
    platform: Platform,
    build: &BuildConfig,
    dirs: &dyn BaseDirs,
    stderr: &mut dyn Write,
) -> Result<()> {
    let candidates = resolve_with_override(platform, dirs, cli.install_dir.as_deref());
    let source = build.artifact_path(platform);
    let home = dirs.home_dir();
    let info = DryRunInfo {
        platform,
        project_dir: &build.project_dir,
        source: &source,
        candidates: &candidates,
        home_dir: home.as_deref(),
        skip_build: cli.skip_build,
        skip_path: cli.skip_path,
        skip_verify: cli.skip_verify,
    };

    writeln!(stderr, "{}", info.display_text())
        .map_err(|source| InstallerError::WriteFailed { source })
}

/// Point out when the current terminal cannot see the new directory yet.
fn report_search_path(
    report: &InstallReport,
    search_path: Option<&std::ffi::OsStr>,
    stderr: &mut dyn Write,
) {
    let dir = &report.installation.dir;
    if !dir_in_search_path(dir, search_path) && report.registration.is_registered() {
        write_stderr_line(
            stderr,
            format!("Note: {dir} is not on this terminal's PATH yet; open a new terminal."),
        );
    }
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("Error: {err}"));
            1
        }
    }
}
