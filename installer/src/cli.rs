//! CLI argument definitions for the mockie installer.
//!
//! Kept apart from the entrypoint so the binary stays focused on wiring the
//! workflow together.

use camino::Utf8PathBuf;
use clap::Parser;

/// Build and install the mockie CLI.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "mockie-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Build and install the mockie CLI.\n\n",
    "Compiles mockie in release mode, copies the executable into a ",
    "platform-appropriate directory, adds that directory to your PATH for ",
    "future sessions, and checks that the command runs.\n\n",
    "On macOS and Linux the executable goes to /usr/local/bin, using sudo when ",
    "that directory is not writable. On Windows it goes to Program Files, or to ",
    "your roaming AppData directory when Program Files is not writable.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Build and install from the current directory:\n",
    "    $ mockie-installer\n\n",
    "  Install an existing release build without touching PATH:\n",
    "    $ mockie-installer --skip-build --skip-path\n\n",
    "  Install into a directory of your choice:\n",
    "    $ mockie-installer --install-dir ~/.local/bin\n\n",
    "  Preview the plan:\n",
    "    $ mockie-installer --dry-run",
))]
pub struct Cli {
    /// Cargo project to build [default: current directory].
    #[arg(short, long, value_name = "DIR")]
    pub project_dir: Option<Utf8PathBuf>,

    /// Install into this directory instead of the platform default.
    #[arg(short, long, value_name = "DIR")]
    pub install_dir: Option<Utf8PathBuf>,

    /// Use the existing release build instead of running cargo.
    #[arg(long)]
    pub skip_build: bool,

    /// Do not add the install directory to PATH.
    #[arg(long)]
    pub skip_path: bool,

    /// Do not run the installed command afterwards.
    #[arg(long)]
    pub skip_verify: bool,

    /// Show the resolved plan and exit without changing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Log level filter implied by the verbosity flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use clap::Parser;
    /// use mockie_installer::cli::Cli;
    ///
    /// let cli = Cli::parse_from(["mockie-installer", "-vv"]);
    /// assert_eq!(cli.log_level(), log::LevelFilter::Debug);
    /// ```
    #[must_use]
    pub const fn log_level(&self) -> log::LevelFilter {
        if self.quiet {
            return log::LevelFilter::Error;
        }
        match self.verbosity {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

impl Default for Cli {
    /// Creates a `Cli` with every step enabled and no overrides.
    fn default() -> Self {
        Self {
            project_dir: None,
            install_dir: None,
            skip_build: false,
            skip_path: false,
            skip_verify: false,
            dry_run: false,
            verbosity: 0,
            quiet: false,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
