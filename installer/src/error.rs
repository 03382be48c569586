//! Error types for the mockie installer.
//!
//! Each variant maps to one failure mode of the install workflow. Fatal
//! variants abort the run; advisory variants are reported as warnings while
//! the run still completes (see [`InstallerError::is_fatal`]).

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur during the installation process.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The host operating system is not Windows, macOS or Linux.
    #[error("unsupported operating system: {os}")]
    UnsupportedPlatform {
        /// The operating system name reported by the host.
        os: String,
    },

    /// The external build command exited unsuccessfully.
    #[error("build failed: {reason}")]
    BuildFailed {
        /// Captured error output from the build tool.
        reason: String,
    },

    /// The built artefact is missing from its expected location.
    #[error("executable not found: {path}; did the build produce it?")]
    SourceNotFound {
        /// Path where the artefact was expected.
        path: Utf8PathBuf,
    },

    /// Every candidate directory and the elevation fallback were exhausted.
    #[error("installation failed: {reason}")]
    InstallFailed {
        /// Description of the last failure, including captured command output.
        reason: String,
    },

    /// The install directory could not be added to the persistent PATH.
    #[error("could not update PATH: {reason}")]
    PathUpdateFailed {
        /// Description of why the configuration surface was unusable.
        reason: String,
    },

    /// The installed command could not be confirmed as reachable.
    #[error("could not verify installation: {reason}")]
    VerificationInconclusive {
        /// Description of the failed verification attempt.
        reason: String,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to write status output.
    #[error("failed to write output")]
    WriteFailed {
        /// The underlying error that caused the write to fail.
        #[source]
        source: std::io::Error,
    },

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

impl InstallerError {
    /// Returns `true` when this error must abort the install run.
    ///
    /// PATH registration and verification failures leave a working binary
    /// on disk, so they are reported as warnings instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use mockie_installer::error::InstallerError;
    ///
    /// let warning = InstallerError::PathUpdateFailed {
    ///     reason: "registry unavailable".to_owned(),
    /// };
    /// assert!(!warning.is_fatal());
    ///
    /// let fatal = InstallerError::BuildFailed {
    ///     reason: "error[E0425]".to_owned(),
    /// };
    /// assert!(fatal.is_fatal());
    /// ```
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::PathUpdateFailed { .. } | Self::VerificationInconclusive { .. }
        )
    }
}

/// Result type alias using [`InstallerError`].
pub type Result<T> = std::result::Result<T, InstallerError>;
