//! Post-install verification.
//!
//! Runs the installed command by name with `--version`. The current process
//! environment usually predates the PATH change, so an inconclusive result is
//! expected after a first install and is only ever reported as a hint.

use crate::command::{CommandExecutor, Invocation, run_command};
use crate::error::InstallerError;
use crate::platform::Platform;
use camino::Utf8Path;
use log::debug;

/// Outcome of the verification call.
#[derive(Debug)]
pub enum Verification {
    /// The command ran and exited successfully.
    Confirmed {
        /// Trimmed standard output of the version query.
        version: String,
    },
    /// The command could not be run or exited unsuccessfully.
    Inconclusive(InstallerError),
}

impl Verification {
    /// Whether the installed command was reachable.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

/// Invoke `mockie --version` through the command runner.
///
/// The command is looked up by name on the search path, so a confirmed
/// result also means the install directory is reachable.
///
/// Never fails: any problem is returned as [`Verification::Inconclusive`]
/// carrying [`InstallerError::VerificationInconclusive`].
pub fn verify(executor: &dyn CommandExecutor, platform: Platform) -> Verification {
    let invocation = Invocation::new(platform.executable_name()).arg("--version");
    let result = match run_command(executor, &invocation, "Verifying installation...") {
        Ok(result) => result,
        Err(e) => {
            return Verification::Inconclusive(InstallerError::VerificationInconclusive {
                reason: format!("could not run `{invocation}`: {e}"),
            });
        }
    };

    if result.success() {
        let version = result.stdout.trim().to_owned();
        debug!("verification reported version {version:?}");
        Verification::Confirmed { version }
    } else {
        Verification::Inconclusive(InstallerError::VerificationInconclusive {
            reason: format!("`{invocation}` exited unsuccessfully: {}", result.diagnostic()),
        })
    }
}

/// Whether `dir` is already an entry of the given `PATH` value.
///
/// Used to tell the user whether a new terminal is needed.
#[must_use]
pub fn dir_in_search_path(dir: &Utf8Path, search_path: Option<&std::ffi::OsStr>) -> bool {
    search_path.is_some_and(|path| {
        std::env::split_paths(path).any(|entry| entry.as_path() == dir.as_std_path())
    })
}
