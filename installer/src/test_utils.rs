//! Shared test utilities for the installer crate.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! behaviour tests under `tests/`.

use crate::command::CommandExecutor;
use crate::dirs::BaseDirs;
use crate::error::{InstallerError, Result};
use crate::install::{InstallFs, SystemInstallFs};
use crate::registrar::{ProfileStore, UserPathStore};
use camino::{Utf8Path, Utf8PathBuf};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::io;
use std::process::{ExitStatus, Output};
use tempfile::TempDir;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    output_with_stdout(0, "")
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Creates a command `Output` with the given exit code and stdout.
pub fn output_with_stdout(code: i32, stdout: &str) -> Output {
    Output {
        status: exit_status(code),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

/// An expected command invocation.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The program (e.g. "cargo").
    pub cmd: &'static str,
    /// The arguments to pass to the program.
    pub args: Vec<String>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

impl ExpectedCall {
    /// An expected call returning `result`.
    pub fn new<I, S>(cmd: &'static str, args: I, result: Result<Output>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd,
            args: args.into_iter().map(Into::into).collect(),
            result,
        }
    }
}

/// A scripted [`CommandExecutor`].
///
/// Calls must arrive in the scripted order. Every call is also recorded so
/// behaviour tests can assert on what was (or was not) run.
#[derive(Debug, Default)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    calls: RefCell<Vec<(String, Vec<String>)>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Queue another expected call.
    pub fn push(&self, call: ExpectedCall) {
        self.expected.borrow_mut().push_back(call);
    }

    /// Programs invoked so far, in order.
    pub fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(cmd, _)| cmd.clone()).collect()
    }

    /// Number of invocations of `program`.
    pub fn count(&self, program: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|(cmd, _)| cmd == program)
            .count()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        self.calls.borrow_mut().push((
            cmd.to_owned(),
            args.iter().map(|arg| (*arg).to_owned()).collect(),
        ));

        let call = self.expected.borrow_mut().pop_front().ok_or_else(|| {
            InstallerError::StubMismatch {
                message: format!("unexpected invocation: {cmd} {}", args.join(" ")),
            }
        })?;

        if call.cmd != cmd || call.args != args {
            return Err(InstallerError::StubMismatch {
                message: format!(
                    "expected `{} {}`, got `{cmd} {}`",
                    call.cmd,
                    call.args.join(" "),
                    args.join(" ")
                ),
            });
        }
        call.result
    }
}

/// [`BaseDirs`] with fixed values.
#[derive(Debug, Clone)]
pub struct FakeBaseDirs {
    home: Option<Utf8PathBuf>,
    program_files: Utf8PathBuf,
    app_data: Utf8PathBuf,
}

impl FakeBaseDirs {
    /// Directories rooted at `home`.
    pub fn new(home: impl Into<Utf8PathBuf>) -> Self {
        let home = home.into();
        Self {
            program_files: home.join("Program Files"),
            app_data: home.join("AppData").join("Roaming"),
            home: Some(home),
        }
    }

    /// Directories with no resolvable home.
    pub fn without_home() -> Self {
        Self {
            home: None,
            program_files: Utf8PathBuf::from(crate::dirs::DEFAULT_PROGRAM_FILES),
            app_data: Utf8PathBuf::from(crate::dirs::DEFAULT_APPDATA),
        }
    }

    /// Override the program files directory.
    #[must_use]
    pub fn with_program_files(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.program_files = dir.into();
        self
    }

    /// Override the roaming data directory.
    #[must_use]
    pub fn with_app_data(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.app_data = dir.into();
        self
    }
}

impl BaseDirs for FakeBaseDirs {
    fn home_dir(&self) -> Option<Utf8PathBuf> {
        self.home.clone()
    }

    fn program_files_dir(&self) -> Utf8PathBuf {
        self.program_files.clone()
    }

    fn app_data_dir(&self) -> Utf8PathBuf {
        self.app_data.clone()
    }
}

/// In-memory [`UserPathStore`].
#[derive(Debug, Default)]
pub struct MemoryUserPathStore {
    value: RefCell<Option<String>>,
    writes: Cell<usize>,
    broken: Option<String>,
}

impl MemoryUserPathStore {
    /// A store holding `value`.
    pub fn with_value(value: &str) -> Self {
        Self {
            value: RefCell::new(Some(value.to_owned())),
            ..Self::default()
        }
    }

    /// A store whose reads and writes fail with `reason`.
    pub fn unusable(reason: &str) -> Self {
        Self {
            broken: Some(reason.to_owned()),
            ..Self::default()
        }
    }

    /// The current value.
    pub fn value(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    fn check(&self) -> Result<()> {
        match &self.broken {
            Some(reason) => Err(InstallerError::PathUpdateFailed {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl UserPathStore for MemoryUserPathStore {
    fn read(&self) -> Result<Option<String>> {
        self.check()?;
        Ok(self.value())
    }

    fn write(&self, value: &str) -> Result<()> {
        self.check()?;
        *self.value.borrow_mut() = Some(value.to_owned());
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn location(&self) -> String {
        "memory user PATH".to_owned()
    }
}

/// In-memory [`ProfileStore`].
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    files: RefCell<BTreeMap<Utf8PathBuf, String>>,
    unreadable: BTreeSet<Utf8PathBuf>,
    appends: Cell<usize>,
}

impl MemoryProfileStore {
    /// Add an existing profile file.
    #[must_use]
    pub fn with_file(self, path: &str, contents: &str) -> Self {
        self.files
            .borrow_mut()
            .insert(Utf8PathBuf::from(path), contents.to_owned());
        self
    }

    /// Add a profile file that exists but cannot be read.
    #[must_use]
    pub fn with_unreadable(mut self, path: &str) -> Self {
        self.unreadable.insert(Utf8PathBuf::from(path));
        self
    }

    /// Contents of `path`, if it exists.
    pub fn contents(&self, path: &str) -> Option<String> {
        self.files.borrow().get(Utf8Path::new(path)).cloned()
    }

    /// Whether `path` exists.
    pub fn exists(&self, path: &str) -> bool {
        self.files.borrow().contains_key(Utf8Path::new(path))
            || self.unreadable.contains(Utf8Path::new(path))
    }

    /// Whether nothing has been appended to any file.
    pub fn is_untouched(&self) -> bool {
        self.appends.get() == 0
    }
}

impl ProfileStore for MemoryProfileStore {
    fn read(&self, path: &Utf8Path) -> Result<Option<String>> {
        if self.unreadable.contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied).into());
        }
        Ok(self.files.borrow().get(path).cloned())
    }

    fn append(&self, path: &Utf8Path, text: &str) -> Result<()> {
        let mut files = self.files.borrow_mut();
        let file = files
            .get_mut(path)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        file.push_str(text);
        self.appends.set(self.appends.get() + 1);
        Ok(())
    }
}

/// [`InstallFs`] that refuses writes below chosen directories.
///
/// Creating, copying into or writing under a refused directory fails with
/// [`io::ErrorKind::PermissionDenied`] whatever the process's privileges.
/// Everything else goes to the real filesystem.
#[derive(Debug, Default)]
pub struct DenyingFs {
    refused: Vec<Utf8PathBuf>,
    copies: RefCell<Vec<Utf8PathBuf>>,
}

impl DenyingFs {
    /// Refuse writes below each of `dirs`.
    #[must_use]
    pub fn refusing<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        Self {
            refused: dirs.into_iter().map(Into::into).collect(),
            copies: RefCell::default(),
        }
    }

    /// Destinations of the copies that went through.
    #[must_use]
    pub fn copies(&self) -> Vec<Utf8PathBuf> {
        self.copies.borrow().clone()
    }

    fn check(&self, path: &Utf8Path) -> io::Result<()> {
        if self.refused.iter().any(|dir| path.starts_with(dir)) {
            Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("access to {path} is denied"),
            ))
        } else {
            Ok(())
        }
    }
}

impl InstallFs for DenyingFs {
    fn create_dir_all(&self, dir: &Utf8Path) -> io::Result<()> {
        self.check(dir)?;
        SystemInstallFs.create_dir_all(dir)
    }

    fn copy(&self, source: &Utf8Path, dest: &Utf8Path) -> io::Result<u64> {
        self.check(dest)?;
        let bytes = SystemInstallFs.copy(source, dest)?;
        self.copies.borrow_mut().push(dest.to_owned());
        Ok(bytes)
    }

    fn can_create_in(&self, dir: &Utf8Path) -> bool {
        self.check(dir).is_ok() && SystemInstallFs.can_create_in(dir)
    }
}

/// The path of a temporary directory as UTF-8.
///
/// # Panics
///
/// Panics if the temporary directory path is not valid UTF-8.
pub fn utf8_temp_dir(temp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("temp dir path should be UTF-8")
}

/// Write a fake build artefact at `relative` under `temp`.
///
/// # Panics
///
/// Panics if the file cannot be written.
pub fn write_artifact(temp: &TempDir, relative: &str) -> Utf8PathBuf {
    let path = utf8_temp_dir(temp).join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create artefact directory");
    }
    fs::write(&path, b"\x7fELF fake mockie build").expect("write artefact");
    path
}

/// Create `dir` and make it read-only.
///
/// # Panics
///
/// Panics if the directory cannot be created or its mode changed.
#[cfg(unix)]
pub fn read_only_dir(dir: &Utf8Path) -> Utf8PathBuf {
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).expect("create directory");
    fs::set_permissions(dir, fs::Permissions::from_mode(0o555)).expect("set read-only");
    dir.to_owned()
}

/// Whether the tests run as root, which bypasses permission checks.
#[cfg(all(test, unix))]
pub fn is_root() -> bool {
    // SAFETY: `geteuid` has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

