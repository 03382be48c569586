//! Directory resolution abstraction for platform-specific paths.
//!
//! Install-path resolution must be a pure function of its inputs, so the
//! environment lookups it depends on live behind [`BaseDirs`]. Production
//! code uses [`SystemBaseDirs`]; tests substitute fixed directories.

use camino::Utf8PathBuf;

/// Default Windows program files directory when `PROGRAMFILES` is unset.
pub const DEFAULT_PROGRAM_FILES: &str = r"C:\Program Files";

/// Default Windows roaming data directory when neither `APPDATA` nor a home
/// directory can be determined.
pub const DEFAULT_APPDATA: &str = r"C:\Users\Default\AppData\Roaming";

/// Source of the base directories used by install-path resolution and PATH
/// registration.
pub trait BaseDirs {
    /// The current user's home directory.
    fn home_dir(&self) -> Option<Utf8PathBuf>;

    /// The system-wide program files directory (`%PROGRAMFILES%`).
    fn program_files_dir(&self) -> Utf8PathBuf;

    /// The current user's roaming application data directory (`%APPDATA%`).
    fn app_data_dir(&self) -> Utf8PathBuf;
}

/// [`BaseDirs`] backed by the process environment and `directories-next`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl BaseDirs for SystemBaseDirs {
    fn home_dir(&self) -> Option<Utf8PathBuf> {
        directories_next::BaseDirs::new()
            .and_then(|dirs| Utf8PathBuf::try_from(dirs.home_dir().to_path_buf()).ok())
    }

    fn program_files_dir(&self) -> Utf8PathBuf {
        env_dir("PROGRAMFILES").unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_PROGRAM_FILES))
    }

    fn app_data_dir(&self) -> Utf8PathBuf {
        env_dir("APPDATA")
            .or_else(roaming_data_dir)
            .or_else(|| {
                self.home_dir()
                    .map(|home| home.join("AppData").join("Roaming"))
            })
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_APPDATA))
    }
}

/// Reads a non-empty, UTF-8 directory from an environment variable.
fn env_dir(key: &str) -> Option<Utf8PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(Utf8PathBuf::from)
}

/// The roaming data directory as reported by `directories-next`. This only
/// matches `%APPDATA%` on Windows hosts.
fn roaming_data_dir() -> Option<Utf8PathBuf> {
    if !cfg!(windows) {
        return None;
    }
    directories_next::BaseDirs::new()
        .and_then(|dirs| Utf8PathBuf::try_from(dirs.data_dir().to_path_buf()).ok())
}
