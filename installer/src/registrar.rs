//! Persistent PATH registration.
//!
//! Adds the install directory to the user's command search path for future
//! sessions. Windows stores the user `Path` value in the registry under
//! `HKCU\Environment`; macOS and Linux get an `export PATH=...` line in each
//! existing shell profile. Both surfaces sit behind ports ([`UserPathStore`]
//! and [`ProfileStore`]) so tests can swap in in-memory stores.
//!
//! Registration is idempotent. A surface that already mentions the directory
//! is left alone, and profile files that do not exist are never created.
//! Changes do not reach shells that are already running.

use crate::command::{CommandExecutor, Invocation, run_command};
use crate::dirs::BaseDirs;
use crate::error::{InstallerError, Result};
use crate::platform::Platform;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use std::fmt;
use std::fs;
use std::io::{self, Write};

/// Registry key holding per-user environment variables.
pub const USER_ENVIRONMENT_KEY: &str = r"HKCU\Environment";

/// Name of the per-user search path value.
pub const PATH_VALUE_NAME: &str = "Path";

/// Persistent per-user search path value (the Windows registry surface).
pub trait UserPathStore {
    /// Read the current value, or `None` if it has never been set.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::PathUpdateFailed`] if the store is unusable.
    fn read(&self) -> Result<Option<String>>;

    /// Replace the value.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::PathUpdateFailed`] if the write is rejected.
    fn write(&self, value: &str) -> Result<()>;

    /// Human-readable location of the value, for reporting.
    fn location(&self) -> String;
}

/// Shell profile files (the macOS and Linux surface).
pub trait ProfileStore {
    /// Read a profile, returning `None` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if an existing file cannot be read.
    fn read(&self, path: &Utf8Path) -> Result<Option<String>>;

    /// Append `text` to an existing profile.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened for appending.
    fn append(&self, path: &Utf8Path, text: &str) -> Result<()>;
}

/// [`UserPathStore`] backed by `reg.exe`, driven through the command runner.
pub struct RegistryPathStore<'a> {
    executor: &'a dyn CommandExecutor,
}

impl<'a> RegistryPathStore<'a> {
    /// Create a store that runs `reg` through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self { executor }
    }
}

impl UserPathStore for RegistryPathStore<'_> {
    fn read(&self) -> Result<Option<String>> {
        let invocation =
            Invocation::new("reg").args(["query", USER_ENVIRONMENT_KEY, "/v", PATH_VALUE_NAME]);
        let result = run_command(self.executor, &invocation, "Reading user PATH...")
            .map_err(|e| path_update_failed(&invocation, &e))?;

        if result.success() {
            return Ok(parse_reg_query_value(&result.stdout, PATH_VALUE_NAME));
        }
        if result.diagnostic().to_ascii_lowercase().contains("unable to find") {
            debug!("user PATH value is not set yet");
            return Ok(None);
        }
        Err(InstallerError::PathUpdateFailed {
            reason: format!("`{invocation}` failed: {}", result.diagnostic()),
        })
    }

    fn write(&self, value: &str) -> Result<()> {
        let invocation = Invocation::new("reg").args([
            "add",
            USER_ENVIRONMENT_KEY,
            "/v",
            PATH_VALUE_NAME,
            "/t",
            "REG_EXPAND_SZ",
            "/d",
            value,
            "/f",
        ]);
        let result = run_command(self.executor, &invocation, "Updating PATH on Windows...")
            .map_err(|e| path_update_failed(&invocation, &e))?;

        if result.success() {
            Ok(())
        } else {
            Err(InstallerError::PathUpdateFailed {
                reason: format!("`reg add` failed: {}", result.diagnostic()),
            })
        }
    }

    fn location(&self) -> String {
        format!(r"{USER_ENVIRONMENT_KEY}\{PATH_VALUE_NAME}")
    }
}

fn path_update_failed(invocation: &Invocation, error: &InstallerError) -> InstallerError {
    InstallerError::PathUpdateFailed {
        reason: format!("could not run `{}`: {error}", invocation.program()),
    }
}

/// Extract a value's data from `reg query` output.
///
/// Matching lines look like `    Path    REG_EXPAND_SZ    C:\bin;C:\tools`.
/// The value name is matched case-insensitively, as the registry does.
///
/// # Examples
///
/// ```
/// use mockie_installer::registrar::parse_reg_query_value;
///
/// let output = "\r\nHKEY_CURRENT_USER\\Environment\r\n    Path    REG_EXPAND_SZ    C:\\bin;C:\\My Tools\r\n";
/// assert_eq!(
///     parse_reg_query_value(output, "Path").as_deref(),
///     Some("C:\\bin;C:\\My Tools")
/// );
/// ```
#[must_use]
pub fn parse_reg_query_value(output: &str, name: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let line = line.trim();
        let (field, rest) = line.split_once(char::is_whitespace)?;
        if !field.eq_ignore_ascii_case(name) {
            return None;
        }
        let rest = rest.trim_start();
        let (kind, data) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        kind.starts_with("REG_").then(|| data.trim().to_owned())
    })
}

/// [`ProfileStore`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProfileStore;

impl ProfileStore for FsProfileStore {
    fn read(&self, path: &Utf8Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn append(&self, path: &Utf8Path, text: &str) -> Result<()> {
        let mut file = fs::OpenOptions::new().append(true).open(path)?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }
}

/// A persistent configuration surface that was inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    /// The per-user PATH value, identified by its location.
    UserPath(String),
    /// A shell profile file.
    Profile(Utf8PathBuf),
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserPath(location) => f.write_str(location),
            Self::Profile(path) => write!(f, "{path}"),
        }
    }
}

/// What registration did to one surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceAction {
    /// The directory was appended.
    Appended,
    /// The surface already mentioned the directory; nothing was written.
    AlreadyPresent,
    /// The profile file does not exist and was skipped.
    Missing,
    /// Reading or writing the surface failed.
    Failed(String),
}

/// Outcome for one surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceOutcome {
    /// The surface inspected.
    pub surface: Surface,
    /// The action taken.
    pub action: SurfaceAction,
}

/// Every surface inspected during one registration, in the order visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRecord {
    /// The directory being registered.
    pub dir: Utf8PathBuf,
    /// Per-surface outcomes.
    pub outcomes: Vec<SurfaceOutcome>,
}

impl RegistrationRecord {
    fn new(dir: &Utf8Path) -> Self {
        Self {
            dir: dir.to_owned(),
            outcomes: Vec::new(),
        }
    }

    fn push(&mut self, surface: Surface, action: SurfaceAction) {
        self.outcomes.push(SurfaceOutcome { surface, action });
    }

    /// Surfaces that were modified.
    pub fn appended(&self) -> impl Iterator<Item = &Surface> {
        self.with_action(|action| matches!(action, SurfaceAction::Appended))
    }

    /// Surfaces that already contained the directory.
    pub fn already_present(&self) -> impl Iterator<Item = &Surface> {
        self.with_action(|action| matches!(action, SurfaceAction::AlreadyPresent))
    }

    /// Surfaces that could not be read or written, with the reason.
    pub fn failures(&self) -> impl Iterator<Item = (&Surface, &str)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.action {
            SurfaceAction::Failed(reason) => Some((&outcome.surface, reason.as_str())),
            _ => None,
        })
    }

    /// Whether at least one surface now mentions the directory.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.outcomes.iter().any(|outcome| {
            matches!(
                outcome.action,
                SurfaceAction::Appended | SurfaceAction::AlreadyPresent
            )
        })
    }

    fn with_action<F>(&self, predicate: F) -> impl Iterator<Item = &Surface>
    where
        F: Fn(&SurfaceAction) -> bool,
    {
        self.outcomes
            .iter()
            .filter(move |outcome| predicate(&outcome.action))
            .map(|outcome| &outcome.surface)
    }
}

/// The line appended to shell profiles.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use mockie_installer::registrar::export_line;
///
/// assert_eq!(
///     export_line(Utf8Path::new("/usr/local/bin")),
///     "export PATH=\"/usr/local/bin:$PATH\""
/// );
/// ```
#[must_use]
pub fn export_line(dir: &Utf8Path) -> String {
    format!("export PATH=\"{dir}:$PATH\"")
}

/// Compute the new user PATH value, or `None` if `dir` is already present.
///
/// Presence is a plain substring test, matching how the value is inspected
/// by hand.
#[must_use]
pub fn extend_user_path(current: Option<&str>, dir: &Utf8Path) -> Option<String> {
    let current = current.unwrap_or_default();
    if current.contains(dir.as_str()) {
        return None;
    }
    if current.is_empty() {
        Some(dir.as_str().to_owned())
    } else if current.ends_with(';') {
        Some(format!("{current}{dir}"))
    } else {
        Some(format!("{current};{dir}"))
    }
}

/// Adds a directory to the persistent search path.
pub struct PathRegistrar<'a> {
    user_path: &'a dyn UserPathStore,
    profiles: &'a dyn ProfileStore,
    dirs: &'a dyn BaseDirs,
}

impl<'a> PathRegistrar<'a> {
    /// Create a registrar over the given surfaces.
    #[must_use]
    pub fn new(
        user_path: &'a dyn UserPathStore,
        profiles: &'a dyn ProfileStore,
        dirs: &'a dyn BaseDirs,
    ) -> Self {
        Self {
            user_path,
            profiles,
            dirs,
        }
    }

    /// Register `dir` using the mechanism for `platform`.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::PathUpdateFailed`] when the mechanism itself
    /// is unusable: the user PATH value cannot be read or written, or no home
    /// directory can be found for profile files. Failures on individual
    /// profile files are recorded in the returned record instead.
    pub fn register(&self, platform: Platform, dir: &Utf8Path) -> Result<RegistrationRecord> {
        match platform {
            Platform::Windows => self.register_user_path(dir),
            Platform::MacOs | Platform::Linux => self.register_profiles(platform, dir),
        }
    }

    fn register_user_path(&self, dir: &Utf8Path) -> Result<RegistrationRecord> {
        let mut record = RegistrationRecord::new(dir);
        let surface = Surface::UserPath(self.user_path.location());
        let current = self.user_path.read()?;

        match extend_user_path(current.as_deref(), dir) {
            Some(updated) => {
                self.user_path.write(&updated)?;
                info!("added {dir} to {surface}");
                record.push(surface, SurfaceAction::Appended);
            }
            None => {
                debug!("{dir} already present in {surface}");
                record.push(surface, SurfaceAction::AlreadyPresent);
            }
        }
        Ok(record)
    }

    fn register_profiles(&self, platform: Platform, dir: &Utf8Path) -> Result<RegistrationRecord> {
        let home = self
            .dirs
            .home_dir()
            .ok_or_else(|| InstallerError::PathUpdateFailed {
                reason: "could not determine the home directory".to_owned(),
            })?;

        let mut record = RegistrationRecord::new(dir);
        for profile in platform.shell_profiles() {
            let path = home.join(profile);
            let action = self.register_profile(&path, dir);
            if let SurfaceAction::Failed(reason) = &action {
                warn!("could not update {path}: {reason}");
            }
            record.push(Surface::Profile(path), action);
        }
        Ok(record)
    }

    fn register_profile(&self, path: &Utf8Path, dir: &Utf8Path) -> SurfaceAction {
        let contents = match self.profiles.read(path) {
            Ok(Some(contents)) => contents,
            Ok(None) => return SurfaceAction::Missing,
            Err(e) => return SurfaceAction::Failed(e.to_string()),
        };

        if contents.contains(dir.as_str()) {
            return SurfaceAction::AlreadyPresent;
        }

        let separator = if contents.is_empty() || contents.ends_with('\n') {
            ""
        } else {
            "\n"
        };
        let text = format!("{separator}{}\n", export_line(dir));
        match self.profiles.append(path, &text) {
            Ok(()) => {
                info!("added {dir} to {path}");
                SurfaceAction::Appended
            }
            Err(e) => SurfaceAction::Failed(e.to_string()),
        }
    }
}
