//! Copying the built executable into its install directory.
//!
//! Each platform family gets one bounded escalation path:
//!
//! - Windows tries each candidate directory in order, moving on only when a
//!   copy is refused with a permission error. There is no elevation prompt.
//! - macOS and Linux copy directly when the directory is writable and
//!   otherwise re-issue the copy exactly once through `sudo`.
//!
//! On macOS and Linux the installed file must end up executable; anything
//! else is reported as a failed install.

use crate::command::{CommandExecutor, Invocation, run_command};
use crate::error::{InstallerError, Result};
use crate::platform::Platform;
use crate::resolution::InstallCandidates;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use std::fs;
use std::io;

/// Program used to re-issue a denied copy with elevated privileges.
pub const ELEVATION_PROGRAM: &str = "sudo";

/// The artefact to install and where it may go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    source: Utf8PathBuf,
    candidates: InstallCandidates,
    chosen: Option<Utf8PathBuf>,
}

impl InstallTarget {
    /// Create a target for `source` with the given candidate directories.
    #[must_use]
    pub const fn new(source: Utf8PathBuf, candidates: InstallCandidates) -> Self {
        Self {
            source,
            candidates,
            chosen: None,
        }
    }

    /// The directory the artefact was installed into, once known.
    #[must_use]
    pub fn chosen_dir(&self) -> Option<&Utf8Path> {
        self.chosen.as_deref()
    }
}

/// How the artefact reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMethod {
    /// Plain copy into the primary candidate.
    Direct,
    /// Plain copy into a fallback candidate after the primary was refused.
    Fallback,
    /// Copy re-issued through the elevation program.
    Elevated,
}

/// A completed installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    /// Full path of the installed executable.
    pub path: Utf8PathBuf,
    /// Directory the executable was installed into.
    pub dir: Utf8PathBuf,
    /// How the copy was performed.
    pub method: InstallMethod,
}

/// Filesystem operations used to place the artefact.
///
/// Permission errors surface as [`io::ErrorKind::PermissionDenied`]; the
/// install policies branch on that kind alone.
pub trait InstallFs {
    /// Create `dir` and any missing parents.
    fn create_dir_all(&self, dir: &Utf8Path) -> io::Result<()>;

    /// Copy `source` to `dest`, replacing an existing file.
    fn copy(&self, source: &Utf8Path, dest: &Utf8Path) -> io::Result<u64>;

    /// Whether the current user can create files in the existing `dir`.
    fn can_create_in(&self, dir: &Utf8Path) -> bool;
}

/// [`InstallFs`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInstallFs;

impl InstallFs for SystemInstallFs {
    fn create_dir_all(&self, dir: &Utf8Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    fn copy(&self, source: &Utf8Path, dest: &Utf8Path) -> io::Result<u64> {
        fs::copy(source, dest)
    }

    fn can_create_in(&self, dir: &Utf8Path) -> bool {
        tempfile::Builder::new()
            .prefix(".mockie-install-check")
            .tempfile_in(dir)
            .is_ok()
    }
}

/// Installs the built artefact for one platform.
pub struct Installer<'a> {
    platform: Platform,
    executor: &'a dyn CommandExecutor,
    files: &'a dyn InstallFs,
}

impl<'a> Installer<'a> {
    /// Create an installer on the real filesystem. The executor is only used
    /// for elevated copies.
    #[must_use]
    pub fn new(platform: Platform, executor: &'a dyn CommandExecutor) -> Self {
        Self {
            platform,
            executor,
            files: &SystemInstallFs,
        }
    }

    /// Place files through `files` instead of the real filesystem.
    #[must_use]
    pub fn with_fs(mut self, files: &'a dyn InstallFs) -> Self {
        self.files = files;
        self
    }

    /// Copy the artefact into the first usable candidate directory.
    ///
    /// On success the chosen directory is recorded on `target`. Installing
    /// twice overwrites the previous copy.
    ///
    /// # Errors
    ///
    /// - [`InstallerError::SourceNotFound`] if the artefact does not exist.
    ///   No directory is created in this case.
    /// - [`InstallerError::InstallFailed`] if every candidate is refused, the
    ///   elevated copy fails, or the installed file is not executable.
    pub fn install(&self, target: &mut InstallTarget) -> Result<Installation> {
        if !target.source.is_file() {
            return Err(InstallerError::SourceNotFound {
                path: target.source.clone(),
            });
        }

        let installation = if self.platform.is_unix() {
            self.install_with_elevation(target)?
        } else {
            install_first_permitted(self.files, target, &self.platform.executable_name())?
        };

        info!(
            "installed {} to {} ({:?})",
            target.source, installation.path, installation.method
        );
        target.chosen = Some(installation.dir.clone());
        Ok(installation)
    }

    /// Unix policy: direct copy when writable, otherwise one elevated copy.
    fn install_with_elevation(&self, target: &InstallTarget) -> Result<Installation> {
        let dir = target.candidates.primary();
        let file_name = self.platform.executable_name();
        let dest = dir.join(&file_name);

        if is_writable(self.files, dir) {
            match copy_into(self.files, &target.source, dir, &file_name) {
                Ok(path) => {
                    mark_executable(&path).map_err(|e| InstallerError::InstallFailed {
                        reason: format!("failed to set executable permission on {path}: {e}"),
                    })?;
                    ensure_executable(&path)?;
                    return Ok(Installation {
                        path,
                        dir: dir.to_owned(),
                        method: InstallMethod::Direct,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    warn!("copy to {dest} was denied: {e}");
                }
                Err(e) => {
                    return Err(InstallerError::InstallFailed {
                        reason: format!("failed to copy {} to {dest}: {e}", target.source),
                    });
                }
            }
        } else {
            debug!("{dir} is not writable by the current user");
        }

        self.elevated_copy(&target.source, &dest)?;
        ensure_executable(&dest)?;
        Ok(Installation {
            path: dest,
            dir: dir.to_owned(),
            method: InstallMethod::Elevated,
        })
    }

    /// Re-issue the copy through `sudo install -m 755`, which copies and sets
    /// the executable bits in a single privileged command.
    fn elevated_copy(&self, source: &Utf8Path, dest: &Utf8Path) -> Result<()> {
        let invocation = Invocation::new(ELEVATION_PROGRAM).args([
            "install",
            "-m",
            "755",
            source.as_str(),
            dest.as_str(),
        ]);
        let description = format!("Copying to {dest} (requires {ELEVATION_PROGRAM})...");
        let result = run_command(self.executor, &invocation, &description).map_err(|e| {
            InstallerError::InstallFailed {
                reason: format!("could not run `{invocation}`: {e}"),
            }
        })?;

        if result.success() {
            Ok(())
        } else {
            Err(InstallerError::InstallFailed {
                reason: format!("`{invocation}` failed: {}", result.diagnostic()),
            })
        }
    }
}

/// Windows policy: try each candidate in order, skipping only on permission
/// errors.
fn install_first_permitted(
    files: &dyn InstallFs,
    target: &InstallTarget,
    file_name: &str,
) -> Result<Installation> {
    let mut refusals = Vec::new();

    for (index, dir) in target.candidates.iter().enumerate() {
        match copy_into(files, &target.source, dir, file_name) {
            Ok(path) => {
                let method = if index == 0 {
                    InstallMethod::Direct
                } else {
                    InstallMethod::Fallback
                };
                return Ok(Installation {
                    path,
                    dir: dir.to_owned(),
                    method,
                });
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warn!("no permission to install into {dir}: {e}");
                refusals.push(format!("{dir}: {e}"));
            }
            Err(e) => {
                return Err(InstallerError::InstallFailed {
                    reason: format!("failed to copy {} to {dir}: {e}", target.source),
                });
            }
        }
    }

    Err(InstallerError::InstallFailed {
        reason: format!(
            "permission denied for every candidate directory ({})",
            refusals.join("; ")
        ),
    })
}

/// Create `dir` if needed and copy `source` into it as `file_name`.
fn copy_into(
    files: &dyn InstallFs,
    source: &Utf8Path,
    dir: &Utf8Path,
    file_name: &str,
) -> io::Result<Utf8PathBuf> {
    files.create_dir_all(dir)?;
    let dest = dir.join(file_name);
    files.copy(source, &dest)?;
    Ok(dest)
}

/// Whether the current user can create files in `dir`, creating it when it
/// does not exist yet.
fn is_writable(files: &dyn InstallFs, dir: &Utf8Path) -> bool {
    files.create_dir_all(dir).is_ok() && files.can_create_in(dir)
}

#[cfg(unix)]
fn mark_executable(path: &Utf8Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Utf8Path) -> io::Result<()> {
    Ok(())
}

/// Confirm the installed file exists and carries execute permission.
fn ensure_executable(path: &Utf8Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| InstallerError::InstallFailed {
        reason: format!("installed file {path} is not readable: {e}"),
    })?;

    if has_execute_bits(&metadata) {
        Ok(())
    } else {
        Err(InstallerError::InstallFailed {
            reason: format!("installed file {path} is not executable"),
        })
    }
}

#[cfg(unix)]
fn has_execute_bits(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;

    metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_execute_bits(metadata: &fs::Metadata) -> bool {
    metadata.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MockCommandExecutor;
    use crate::test_utils::{
        DenyingFs, failure_output, success_output, utf8_temp_dir, write_artifact,
    };
    use tempfile::TempDir;

    fn target_in(temp: &TempDir, candidates: InstallCandidates) -> InstallTarget {
        let source = write_artifact(temp, "build/mockie");
        InstallTarget::new(source, candidates)
    }

    #[test]
    fn missing_source_fails_before_creating_directories() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8_temp_dir(&temp);
        let dir = root.join("bin");
        let mut target = InstallTarget::new(
            root.join("target/release/mockie"),
            InstallCandidates::single(dir.clone()),
        );
        let executor = MockCommandExecutor::new();

        let err = Installer::new(Platform::Linux, &executor)
            .install(&mut target)
            .expect_err("install should fail");

        assert!(matches!(err, InstallerError::SourceNotFound { .. }));
        assert!(!dir.exists(), "no directory may be created");
        assert!(target.chosen_dir().is_none());
    }

    #[test]
    fn writable_unix_directory_is_used_directly() {
        let temp = TempDir::new().expect("temp dir");
        let dir = utf8_temp_dir(&temp).join("bin");
        let mut target = target_in(&temp, InstallCandidates::single(dir.clone()));
        let executor = MockCommandExecutor::new();

        let installation = Installer::new(Platform::Linux, &executor)
            .install(&mut target)
            .expect("install should succeed");

        assert_eq!(installation.method, InstallMethod::Direct);
        assert_eq!(installation.path, dir.join("mockie"));
        assert_eq!(target.chosen_dir(), Some(dir.as_path()));
    }

    #[cfg(unix)]
    #[test]
    fn direct_install_sets_executable_bits() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().expect("temp dir");
        let dir = utf8_temp_dir(&temp).join("bin");
        let mut target = target_in(&temp, InstallCandidates::single(dir));
        let executor = MockCommandExecutor::new();

        let installation = Installer::new(Platform::MacOs, &executor)
            .install(&mut target)
            .expect("install should succeed");

        let mode = fs::metadata(&installation.path)
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn reinstall_overwrites_previous_copy() {
        let temp = TempDir::new().expect("temp dir");
        let dir = utf8_temp_dir(&temp).join("bin");
        let mut target = target_in(&temp, InstallCandidates::single(dir.clone()));
        fs::create_dir_all(&dir).expect("create dir");
        fs::write(dir.join("mockie"), b"old build").expect("write old copy");
        let executor = MockCommandExecutor::new();

        Installer::new(Platform::Linux, &executor)
            .install(&mut target)
            .expect("install should succeed");

        let contents = fs::read(dir.join("mockie")).expect("read installed file");
        assert_ne!(contents, b"old build");
    }

    #[test]
    fn uncreatable_unix_directory_escalates_once_and_fails() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8_temp_dir(&temp);
        fs::write(root.join("blocker"), b"not a directory").expect("write blocker");
        let dir = root.join("blocker").join("bin");
        let mut target = target_in(&temp, InstallCandidates::single(dir));

        let mut executor = MockCommandExecutor::new();
        executor
            .expect_run()
            .withf(|cmd, args| {
                cmd == "sudo"
                    && args.first() == Some(&"install")
                    && args.get(1..3) == Some(&["-m", "755"][..])
            })
            .times(1)
            .returning(|_, _| Ok(failure_output("sudo: a password is required")));

        let err = Installer::new(Platform::Linux, &executor)
            .install(&mut target)
            .expect_err("elevated copy should fail");

        match err {
            InstallerError::InstallFailed { reason } => {
                assert!(reason.contains("a password is required"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(target.chosen_dir().is_none());
    }

    #[test]
    fn elevated_copy_that_leaves_no_file_is_a_failure() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8_temp_dir(&temp);
        fs::write(root.join("blocker"), b"not a directory").expect("write blocker");
        let mut target = target_in(
            &temp,
            InstallCandidates::single(root.join("blocker").join("bin")),
        );

        let mut executor = MockCommandExecutor::new();
        executor
            .expect_run()
            .times(1)
            .returning(|_, _| Ok(success_output()));

        let err = Installer::new(Platform::MacOs, &executor)
            .install(&mut target)
            .expect_err("missing installed file should fail");

        assert!(matches!(err, InstallerError::InstallFailed { .. }));
    }

    #[test]
    fn windows_uses_primary_when_permitted() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8_temp_dir(&temp);
        let primary = root.join("Program Files").join("mockie");
        let fallback = root.join("AppData").join("mockie");
        let mut target = target_in(
            &temp,
            InstallCandidates::new(primary.clone(), vec![fallback.clone()]),
        );
        let executor = MockCommandExecutor::new();

        let installation = Installer::new(Platform::Windows, &executor)
            .install(&mut target)
            .expect("install should succeed");

        assert_eq!(installation.method, InstallMethod::Direct);
        assert_eq!(installation.path, primary.join("mockie.exe"));
        assert!(!fallback.exists(), "fallback must stay untouched");
    }

    #[test]
    fn windows_non_permission_failure_does_not_fall_back() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8_temp_dir(&temp);
        fs::write(root.join("blocker"), b"not a directory").expect("write blocker");
        let fallback = root.join("AppData").join("mockie");
        let mut target = target_in(
            &temp,
            InstallCandidates::new(root.join("blocker").join("mockie"), vec![fallback.clone()]),
        );
        let executor = MockCommandExecutor::new();

        let err = Installer::new(Platform::Windows, &executor)
            .install(&mut target)
            .expect_err("install should fail");

        assert!(matches!(err, InstallerError::InstallFailed { .. }));
        assert!(!fallback.exists());
    }

    #[test]
    fn windows_refused_primary_falls_back() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8_temp_dir(&temp);
        let program_files = root.join("Program Files");
        let fallback = root.join("AppData").join("mockie");
        let mut target = target_in(
            &temp,
            InstallCandidates::new(program_files.join("mockie"), vec![fallback.clone()]),
        );
        let files = DenyingFs::refusing([program_files.clone()]);
        let executor = MockCommandExecutor::new();

        let installation = Installer::new(Platform::Windows, &executor)
            .with_fs(&files)
            .install(&mut target)
            .expect("fallback install should succeed");

        assert_eq!(installation.method, InstallMethod::Fallback);
        assert_eq!(installation.path, fallback.join("mockie.exe"));
        assert_eq!(target.chosen_dir(), Some(fallback.as_path()));
        assert_eq!(files.copies(), vec![fallback.join("mockie.exe")]);
        assert!(!program_files.exists(), "refused directory must not appear");
    }

    #[test]
    fn windows_refused_everywhere_names_each_candidate() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8_temp_dir(&temp);
        let primary = root.join("a").join("mockie");
        let fallback = root.join("b").join("mockie");
        let mut target = target_in(
            &temp,
            InstallCandidates::new(primary.clone(), vec![fallback.clone()]),
        );
        let files = DenyingFs::refusing([root.join("a"), root.join("b")]);
        let executor = MockCommandExecutor::new();

        let err = Installer::new(Platform::Windows, &executor)
            .with_fs(&files)
            .install(&mut target)
            .expect_err("install should fail");

        match err {
            InstallerError::InstallFailed { reason } => {
                assert!(reason.contains("every candidate"));
                assert!(reason.contains(primary.as_str()));
                assert!(reason.contains(fallback.as_str()));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(files.copies().is_empty());
        assert!(target.chosen_dir().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn refused_unix_directory_is_installed_by_one_elevated_copy() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().expect("temp dir");
        let dir = utf8_temp_dir(&temp).join("bin");
        let mut target = target_in(&temp, InstallCandidates::single(dir.clone()));
        let files = DenyingFs::refusing([dir.clone()]);

        let mut executor = MockCommandExecutor::new();
        executor
            .expect_run()
            .withf(|cmd, args| {
                cmd == "sudo" && args.get(..3) == Some(&["install", "-m", "755"][..])
            })
            .times(1)
            .returning(|_, args| {
                // Stand in for the privileged copy.
                let (Some(source), Some(dest)) = (args.get(3), args.get(4)) else {
                    return Ok(failure_output("bad arguments"));
                };
                let dest = Utf8Path::new(dest);
                fs::create_dir_all(dest.parent().expect("dest has parent"))?;
                fs::copy(source, dest)?;
                fs::set_permissions(dest, fs::Permissions::from_mode(0o755))?;
                Ok(success_output())
            });

        let installation = Installer::new(Platform::Linux, &executor)
            .with_fs(&files)
            .install(&mut target)
            .expect("elevated install should succeed");

        assert_eq!(installation.method, InstallMethod::Elevated);
        assert_eq!(installation.path, dir.join("mockie"));
        assert!(files.copies().is_empty(), "no unprivileged copy may land");
        let mode = fs::metadata(&installation.path)
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    mod permissions {
        use super::*;
        use crate::test_utils::{is_root, read_only_dir};

        #[test]
        fn windows_permission_denied_falls_back() {
            if is_root() {
                return;
            }
            let temp = TempDir::new().expect("temp dir");
            let root = utf8_temp_dir(&temp);
            let primary = read_only_dir(&root.join("Program Files")).join("mockie");
            let fallback = root.join("AppData").join("mockie");
            let mut target = target_in(
                &temp,
                InstallCandidates::new(primary, vec![fallback.clone()]),
            );
            let executor = MockCommandExecutor::new();

            let installation = Installer::new(Platform::Windows, &executor)
                .install(&mut target)
                .expect("fallback install should succeed");

            assert_eq!(installation.method, InstallMethod::Fallback);
            assert_eq!(target.chosen_dir(), Some(fallback.as_path()));
        }

        #[test]
        fn windows_fails_when_every_candidate_is_denied() {
            if is_root() {
                return;
            }
            let temp = TempDir::new().expect("temp dir");
            let root = utf8_temp_dir(&temp);
            let primary = read_only_dir(&root.join("a")).join("mockie");
            let fallback = read_only_dir(&root.join("b")).join("mockie");
            let mut target = target_in(&temp, InstallCandidates::new(primary, vec![fallback]));
            let executor = MockCommandExecutor::new();

            let err = Installer::new(Platform::Windows, &executor)
                .install(&mut target)
                .expect_err("install should fail");

            match err {
                InstallerError::InstallFailed { reason } => {
                    assert!(reason.contains("every candidate"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn read_only_unix_directory_succeeds_through_elevation() {
            use std::os::unix::fs::PermissionsExt;

            if is_root() {
                return;
            }
            let temp = TempDir::new().expect("temp dir");
            let dir = read_only_dir(&utf8_temp_dir(&temp).join("bin"));
            let mut target = target_in(&temp, InstallCandidates::single(dir.clone()));

            let mut executor = MockCommandExecutor::new();
            executor
                .expect_run()
                .withf(|cmd, _| cmd == "sudo")
                .times(1)
                .returning(|_, args| {
                    // Stand in for the privileged copy.
                    let (Some(source), Some(dest)) = (args.get(3), args.get(4)) else {
                        return Ok(failure_output("bad arguments"));
                    };
                    let dest = Utf8Path::new(dest);
                    let parent = dest.parent().expect("dest has parent");
                    fs::set_permissions(parent, fs::Permissions::from_mode(0o755))?;
                    fs::copy(source, dest)?;
                    fs::set_permissions(dest, fs::Permissions::from_mode(0o755))?;
                    Ok(success_output())
                });

            let installation = Installer::new(Platform::Linux, &executor)
                .install(&mut target)
                .expect("elevated install should succeed");

            assert_eq!(installation.method, InstallMethod::Elevated);
            assert_eq!(installation.path, dir.join("mockie"));
        }
    }
}
