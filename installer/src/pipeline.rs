//! Install workflow orchestration.
//!
//! [`Orchestrator`] drives one run through a fixed sequence of stages:
//!
//! ```text
//! Detecting -> Building -> Installing -> RegisteringPath -> Verifying -> Done
//! ```
//!
//! Each stage runs once. A fatal error while detecting, building or
//! installing moves the run to [`Stage::Failed`] and is returned to the
//! caller. PATH registration and verification problems never fail the run:
//! they are reported as warnings and recorded on the [`InstallReport`].

use crate::builder::{BuildConfig, Builder};
use crate::command::CommandExecutor;
use crate::dirs::BaseDirs;
use crate::error::{InstallerError, Result};
use crate::install::{InstallFs, InstallTarget, Installation, Installer};
use crate::output::{
    banner, installed_message, manual_path_instructions, next_steps, registration_lines,
    verification_hint, write_stderr_line,
};
use crate::platform::Platform;
use crate::registrar::{PathRegistrar, ProfileStore, RegistrationRecord, UserPathStore};
use crate::resolution::resolve_with_override;
use crate::verify::{Verification, verify};
use camino::Utf8PathBuf;
use log::{debug, warn};
use std::fmt;
use std::io::Write;

/// A point in the install workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Identifying the host platform.
    Detecting,
    /// Compiling the release build.
    Building,
    /// Copying the executable into place.
    Installing,
    /// Adding the install directory to the persistent PATH.
    RegisteringPath,
    /// Running the installed command.
    Verifying,
    /// The run completed.
    Done,
    /// The run stopped on a fatal error.
    Failed(String),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detecting => f.write_str("detecting platform"),
            Self::Building => f.write_str("building"),
            Self::Installing => f.write_str("installing"),
            Self::RegisteringPath => f.write_str("registering PATH"),
            Self::Verifying => f.write_str("verifying"),
            Self::Done => f.write_str("done"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Collaborators the workflow acts through.
pub struct InstallContext<'a> {
    /// Runs every external command.
    pub executor: &'a dyn CommandExecutor,
    /// Base directories for path resolution and profile lookup.
    pub dirs: &'a dyn BaseDirs,
    /// The per-user PATH value (Windows).
    pub user_path: &'a dyn UserPathStore,
    /// Shell profile files (macOS and Linux).
    pub profiles: &'a dyn ProfileStore,
    /// Filesystem the artefact is copied through.
    pub files: &'a dyn InstallFs,
}

/// Switches for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    /// Where the project lives and where cargo puts the artefact.
    pub build: BuildConfig,
    /// Replaces the platform's candidate directories when set.
    pub install_dir: Option<Utf8PathBuf>,
    /// Install the existing release artefact without running cargo.
    pub skip_build: bool,
    /// Leave PATH surfaces untouched.
    pub skip_path: bool,
    /// Do not run the installed command.
    pub skip_verify: bool,
    /// Suppress status output.
    pub quiet: bool,
}

impl InstallOptions {
    /// Options that run every stage.
    #[must_use]
    pub const fn new(build: BuildConfig) -> Self {
        Self {
            build,
            install_dir: None,
            skip_build: false,
            skip_path: false,
            skip_verify: false,
            quiet: false,
        }
    }
}

/// What PATH registration amounted to.
#[derive(Debug)]
pub enum PathRegistration {
    /// Registration ran; per-surface outcomes are in the record.
    Registered(RegistrationRecord),
    /// The mechanism itself failed. Advisory only.
    Failed(InstallerError),
    /// Registration was switched off.
    Skipped,
}

impl PathRegistration {
    /// Whether the install directory is now on the persistent PATH.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(record) if record.is_registered())
    }
}

/// Summary of a completed run.
#[derive(Debug)]
pub struct InstallReport {
    /// The detected platform.
    pub platform: Platform,
    /// Where the executable ended up.
    pub installation: Installation,
    /// PATH registration outcome.
    pub registration: PathRegistration,
    /// Verification outcome, unless skipped.
    pub verification: Option<Verification>,
}

impl InstallReport {
    /// Advisory errors raised during the run, in order.
    pub fn warnings(&self) -> impl Iterator<Item = &InstallerError> {
        let registration = match &self.registration {
            PathRegistration::Failed(err) => Some(err),
            PathRegistration::Registered(_) | PathRegistration::Skipped => None,
        };
        let verification = match &self.verification {
            Some(Verification::Inconclusive(err)) => Some(err),
            Some(Verification::Confirmed { .. }) | None => None,
        };
        registration.into_iter().chain(verification)
    }
}

/// Drives one install run through its stages.
pub struct Orchestrator<'a> {
    context: InstallContext<'a>,
    options: InstallOptions,
    stage: Stage,
    history: Vec<Stage>,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator in the [`Stage::Detecting`] state.
    #[must_use]
    pub fn new(context: InstallContext<'a>, options: InstallOptions) -> Self {
        Self {
            context,
            options,
            stage: Stage::Detecting,
            history: vec![Stage::Detecting],
        }
    }

    /// The current stage.
    #[must_use]
    pub const fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Every stage entered so far, in order.
    #[must_use]
    pub fn history(&self) -> &[Stage] {
        &self.history
    }

    /// Run the workflow for the operating system named `os`.
    ///
    /// `os` takes the values of [`std::env::consts::OS`].
    ///
    /// # Errors
    ///
    /// Returns the fatal error that stopped the run:
    /// [`InstallerError::UnsupportedPlatform`],
    /// [`InstallerError::BuildFailed`], [`InstallerError::SourceNotFound`]
    /// or [`InstallerError::InstallFailed`], or an I/O error from spawning
    /// the build.
    pub fn run(&mut self, os: &str, stderr: &mut dyn Write) -> Result<InstallReport> {
        self.status(stderr, banner("MOCKIE INSTALLER"));

        let platform = self.fatal(Platform::from_os_name(os))?;
        self.status(stderr, format!("Detected platform: {platform}"));

        let source = self.build(platform, stderr)?;
        let installation = self.install(platform, source, stderr)?;
        let registration = self.register(platform, &installation, stderr);
        let verification = self.verify(platform, stderr);

        self.enter(Stage::Done);
        self.status(stderr, banner("INSTALLATION COMPLETE"));
        for line in next_steps() {
            self.status(stderr, line);
        }

        Ok(InstallReport {
            platform,
            installation,
            registration,
            verification,
        })
    }

    fn build(&mut self, platform: Platform, stderr: &mut dyn Write) -> Result<Utf8PathBuf> {
        self.enter(Stage::Building);
        if self.options.skip_build {
            debug!("skipping build; using existing release artefact");
            return Ok(self.options.build.artifact_path(platform));
        }

        self.status(stderr, banner("Building mockie"));
        let builder = Builder::new(self.options.build.clone(), self.context.executor);
        let result = self.fatal(builder.build(platform))?;
        self.status(stderr, "Build complete");
        Ok(result.artifact_path)
    }

    fn install(
        &mut self,
        platform: Platform,
        source: Utf8PathBuf,
        stderr: &mut dyn Write,
    ) -> Result<Installation> {
        self.enter(Stage::Installing);
        self.status(stderr, banner("Installing"));

        let candidates = resolve_with_override(
            platform,
            self.context.dirs,
            self.options.install_dir.as_deref(),
        );
        let mut target = InstallTarget::new(source, candidates);
        let installer =
            Installer::new(platform, self.context.executor).with_fs(self.context.files);
        let installation = self.fatal(installer.install(&mut target))?;

        self.status(stderr, installed_message(&installation));
        Ok(installation)
    }

    fn register(
        &mut self,
        platform: Platform,
        installation: &Installation,
        stderr: &mut dyn Write,
    ) -> PathRegistration {
        self.enter(Stage::RegisteringPath);
        if self.options.skip_path {
            debug!("skipping PATH registration");
            return PathRegistration::Skipped;
        }

        self.status(stderr, banner("Updating PATH"));
        let registrar = PathRegistrar::new(
            self.context.user_path,
            self.context.profiles,
            self.context.dirs,
        );
        match registrar.register(platform, &installation.dir) {
            Ok(record) => {
                for line in registration_lines(&record) {
                    self.status(stderr, line);
                }
                if !record.is_registered() {
                    self.status(
                        stderr,
                        manual_path_instructions(platform, &installation.dir),
                    );
                }
                PathRegistration::Registered(record)
            }
            Err(err) => {
                warn!("PATH registration failed: {err}");
                self.status(stderr, format!("Warning: {err}"));
                self.status(
                    stderr,
                    manual_path_instructions(platform, &installation.dir),
                );
                PathRegistration::Failed(err)
            }
        }
    }

    fn verify(&mut self, platform: Platform, stderr: &mut dyn Write) -> Option<Verification> {
        self.enter(Stage::Verifying);
        if self.options.skip_verify {
            debug!("skipping verification");
            return None;
        }

        self.status(stderr, banner("Verifying installation"));
        let verification = verify(self.context.executor, platform);
        match &verification {
            Verification::Confirmed { version } => {
                self.status(stderr, format!("Installation verified: {version}"));
            }
            Verification::Inconclusive(err) => {
                debug!("{err}");
                self.status(stderr, verification_hint());
            }
        }
        Some(verification)
    }

    /// Move to `Failed` when `result` carries an error.
    fn fatal<T>(&mut self, result: Result<T>) -> Result<T> {
        result.inspect_err(|err| self.enter(Stage::Failed(err.to_string())))
    }

    fn enter(&mut self, stage: Stage) {
        debug!("{} -> {}", self.stage, stage);
        self.history.push(stage.clone());
        self.stage = stage;
    }

    fn status(&self, stderr: &mut dyn Write, message: impl fmt::Display) {
        if !self.options.quiet {
            write_stderr_line(stderr, message);
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
