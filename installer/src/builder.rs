//! Release build of the mockie executable.
//!
//! The build itself is opaque: the installer runs `cargo build --release`
//! and only looks at the exit status and captured output. Whether the
//! expected artefact actually exists is checked later by the installer.

use crate::command::{CommandExecutor, Invocation, run_command};
use crate::error::{InstallerError, Result};
use crate::platform::Platform;
use camino::{Utf8Path, Utf8PathBuf};

/// Configuration for the build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Cargo project root. The build command runs from the current
    /// directory, which the binary sets to this path.
    pub project_dir: Utf8PathBuf,
    /// Directory cargo writes build artefacts into.
    pub target_dir: Utf8PathBuf,
}

impl BuildConfig {
    /// Configuration for a project using the default `target` directory.
    #[must_use]
    pub fn for_project(project_dir: &Utf8Path) -> Self {
        Self {
            project_dir: project_dir.to_owned(),
            target_dir: project_dir.join("target"),
        }
    }

    /// Configuration honouring a `CARGO_TARGET_DIR` value when one is set.
    ///
    /// Relative target directories are resolved against the project root.
    #[must_use]
    pub fn with_target_override(project_dir: &Utf8Path, target_dir: Option<&str>) -> Self {
        match target_dir.filter(|dir| !dir.trim().is_empty()) {
            Some(dir) => Self {
                project_dir: project_dir.to_owned(),
                target_dir: project_dir.join(dir),
            },
            None => Self::for_project(project_dir),
        }
    }

    /// Path of the release artefact cargo is expected to produce.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use mockie_installer::builder::BuildConfig;
    /// use mockie_installer::platform::Platform;
    ///
    /// let config = BuildConfig::for_project(Utf8Path::new("/src/mockie"));
    /// assert_eq!(
    ///     config.artifact_path(Platform::Windows).as_str(),
    ///     "/src/mockie/target/release/mockie.exe"
    /// );
    /// ```
    #[must_use]
    pub fn artifact_path(&self, platform: Platform) -> Utf8PathBuf {
        self.target_dir
            .join("release")
            .join(platform.executable_name())
    }
}

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// Where the built executable is expected to be.
    pub artifact_path: Utf8PathBuf,
}

/// Runs the external build tool.
pub struct Builder<'a> {
    config: BuildConfig,
    executor: &'a dyn CommandExecutor,
}

impl<'a> Builder<'a> {
    /// Create a new builder with the given configuration.
    #[must_use]
    pub fn new(config: BuildConfig, executor: &'a dyn CommandExecutor) -> Self {
        Self { config, executor }
    }

    /// Compile the project in release mode.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::BuildFailed`] with the build tool's captured
    /// error output if cargo exits unsuccessfully, or an I/O error if cargo
    /// cannot be spawned.
    pub fn build(&self, platform: Platform) -> Result<BuildResult> {
        let invocation = Invocation::new("cargo").args(["build", "--release"]);
        let result = run_command(self.executor, &invocation, "Compiling...")?;

        if !result.success() {
            return Err(InstallerError::BuildFailed {
                reason: result.diagnostic().to_owned(),
            });
        }

        Ok(BuildResult {
            artifact_path: self.config.artifact_path(platform),
        })
    }
}
