//! Install directory resolution.
//!
//! Computes the ordered candidate directories for a platform. Resolution is
//! pure: it reads directory values through [`BaseDirs`] and never touches the
//! filesystem.

use crate::dirs::BaseDirs;
use crate::platform::{ARTIFACT_NAME, Platform};
use camino::{Utf8Path, Utf8PathBuf};

/// Conventional system-local executable directory on macOS and Linux.
pub const UNIX_INSTALL_DIR: &str = "/usr/local/bin";

/// Ordered, non-empty list of directories eligible to receive the executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallCandidates {
    primary: Utf8PathBuf,
    fallbacks: Vec<Utf8PathBuf>,
}

impl InstallCandidates {
    /// Create a candidate list with a primary directory and ordered fallbacks.
    #[must_use]
    pub const fn new(primary: Utf8PathBuf, fallbacks: Vec<Utf8PathBuf>) -> Self {
        Self { primary, fallbacks }
    }

    /// Create a candidate list holding a single directory.
    #[must_use]
    pub const fn single(dir: Utf8PathBuf) -> Self {
        Self::new(dir, Vec::new())
    }

    /// The preferred directory.
    #[must_use]
    pub fn primary(&self) -> &Utf8Path {
        &self.primary
    }

    /// Directories to try, in order, after the primary.
    #[must_use]
    pub fn fallbacks(&self) -> &[Utf8PathBuf] {
        &self.fallbacks
    }

    /// All candidates in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Utf8Path> {
        std::iter::once(self.primary.as_path())
            .chain(self.fallbacks.iter().map(Utf8PathBuf::as_path))
    }

    /// Number of candidates (always at least one).
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.fallbacks.len()
    }

    /// Always `false`; provided for API symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Resolve the candidate install directories for `platform`.
///
/// - Windows: `<PROGRAMFILES>\mockie`, falling back to `<APPDATA>\mockie`.
/// - macOS and Linux: `/usr/local/bin` only. These platforms fall back to an
///   elevated copy rather than another directory.
///
/// # Examples
///
/// ```
/// use mockie_installer::dirs::SystemBaseDirs;
/// use mockie_installer::platform::Platform;
/// use mockie_installer::resolution::resolve_install_dirs;
///
/// let candidates = resolve_install_dirs(Platform::Linux, &SystemBaseDirs);
/// assert_eq!(candidates.primary().as_str(), "/usr/local/bin");
/// assert!(candidates.fallbacks().is_empty());
/// ```
#[must_use]
pub fn resolve_install_dirs(platform: Platform, dirs: &dyn BaseDirs) -> InstallCandidates {
    match platform {
        Platform::Windows => InstallCandidates::new(
            dirs.program_files_dir().join(ARTIFACT_NAME),
            vec![dirs.app_data_dir().join(ARTIFACT_NAME)],
        ),
        Platform::MacOs | Platform::Linux => {
            InstallCandidates::single(Utf8PathBuf::from(UNIX_INSTALL_DIR))
        }
    }
}

/// Resolve candidates, honouring an explicit directory override.
///
/// An override replaces the whole candidate list with that one directory.
#[must_use]
pub fn resolve_with_override(
    platform: Platform,
    dirs: &dyn BaseDirs,
    override_dir: Option<&Utf8Path>,
) -> InstallCandidates {
    override_dir.map_or_else(
        || resolve_install_dirs(platform, dirs),
        |dir| InstallCandidates::single(dir.to_owned()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeBaseDirs;
    use rstest::{fixture, rstest};

    #[fixture]
    fn dirs() -> FakeBaseDirs {
        FakeBaseDirs::new("/home/ana")
            .with_program_files(r"C:\Program Files")
            .with_app_data(r"C:\Users\ana\AppData\Roaming")
    }

    #[rstest]
    fn every_platform_has_a_well_formed_primary(dirs: FakeBaseDirs) {
        for platform in Platform::ALL {
            let candidates = resolve_install_dirs(platform, &dirs);

            assert!(!candidates.is_empty(), "{platform}");
            assert!(!candidates.primary().as_str().is_empty(), "{platform}");
            assert_eq!(candidates.iter().next(), Some(candidates.primary()));
        }
    }

    #[rstest]
    fn windows_prefers_program_files_then_app_data(dirs: FakeBaseDirs) {
        let candidates = resolve_install_dirs(Platform::Windows, &dirs);

        assert!(candidates.primary().as_str().starts_with(r"C:\Program Files"));
        assert_eq!(candidates.primary().file_name(), Some("mockie"));
        assert_eq!(candidates.fallbacks().len(), 1);
        let fallback = candidates.fallbacks().first().expect("fallback");
        assert!(fallback.as_str().starts_with(r"C:\Users\ana\AppData\Roaming"));
        assert_eq!(fallback.file_name(), Some("mockie"));
    }

    #[rstest]
    #[case::macos(Platform::MacOs)]
    #[case::linux(Platform::Linux)]
    fn unix_has_single_system_candidate(dirs: FakeBaseDirs, #[case] platform: Platform) {
        let candidates = resolve_install_dirs(platform, &dirs);

        assert_eq!(candidates.primary().as_str(), UNIX_INSTALL_DIR);
        assert_eq!(candidates.len(), 1);
    }

    #[rstest]
    fn override_replaces_all_candidates(dirs: FakeBaseDirs) {
        let candidates = resolve_with_override(
            Platform::Windows,
            &dirs,
            Some(Utf8Path::new("/opt/mockie/bin")),
        );

        assert_eq!(candidates.primary().as_str(), "/opt/mockie/bin");
        assert!(candidates.fallbacks().is_empty());
    }
}
