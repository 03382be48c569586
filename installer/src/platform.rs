//! Host platform detection.
//!
//! The installer supports three platform families. Everything that differs
//! between them (executable naming, shell profiles, install policy) is keyed
//! off [`Platform`].

use crate::error::{InstallerError, Result};
use std::fmt;

/// Name of the artefact being installed, without any platform suffix.
pub const ARTIFACT_NAME: &str = "mockie";

/// The platform family the installer is running on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Microsoft Windows.
    Windows,
    /// Apple macOS.
    MacOs,
    /// Linux distributions.
    Linux,
}

impl Platform {
    /// All supported platforms.
    pub const ALL: [Self; 3] = [Self::Windows, Self::MacOs, Self::Linux];

    /// Detect the platform of the running host.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnsupportedPlatform`] when the host OS is
    /// not one of the supported families.
    pub fn detect() -> Result<Self> {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Map an OS name as reported by `std::env::consts::OS` to a platform.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::UnsupportedPlatform`] for unknown names.
    ///
    /// # Examples
    ///
    /// ```
    /// use mockie_installer::platform::Platform;
    ///
    /// assert_eq!(Platform::from_os_name("macos")?, Platform::MacOs);
    /// assert!(Platform::from_os_name("freebsd").is_err());
    /// # Ok::<(), mockie_installer::error::InstallerError>(())
    /// ```
    pub fn from_os_name(os: &str) -> Result<Self> {
        match os {
            "windows" => Ok(Self::Windows),
            "macos" => Ok(Self::MacOs),
            "linux" => Ok(Self::Linux),
            other => Err(InstallerError::UnsupportedPlatform {
                os: other.to_owned(),
            }),
        }
    }

    /// Human-readable platform name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Windows => "Windows",
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
        }
    }

    /// File name of the installed executable on this platform.
    #[must_use]
    pub fn executable_name(self) -> String {
        match self {
            Self::Windows => format!("{ARTIFACT_NAME}.exe"),
            Self::MacOs | Self::Linux => ARTIFACT_NAME.to_owned(),
        }
    }

    /// Shell profile files, relative to the home directory, that receive the
    /// PATH export line. Empty on Windows, which uses the registry instead.
    ///
    /// The order is the preference order for the family's default shells.
    #[must_use]
    pub const fn shell_profiles(self) -> &'static [&'static str] {
        match self {
            Self::Windows => &[],
            Self::MacOs => &[".zshrc", ".bash_profile"],
            Self::Linux => &[".bashrc", ".bash_profile", ".zshrc"],
        }
    }

    /// Whether the platform uses Unix file permissions and `sudo` elevation.
    #[must_use]
    pub const fn is_unix(self) -> bool {
        matches!(self, Self::MacOs | Self::Linux)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
