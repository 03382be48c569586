//! Output formatting for the installer CLI.
//!
//! Status text is human-readable only and goes to stderr. This module builds
//! the strings; callers write them with [`write_stderr_line`].

use crate::install::{InstallMethod, Installation};
use crate::platform::{ARTIFACT_NAME, Platform};
use crate::registrar::{RegistrationRecord, Surface, export_line};
use crate::resolution::InstallCandidates;
use camino::Utf8Path;
use std::io::Write;

const RULE_WIDTH: usize = 60;

/// Write one line of status output, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// A section banner.
///
/// # Examples
///
/// ```
/// use mockie_installer::output::banner;
///
/// let text = banner("Verifying installation");
/// assert!(text.contains("  Verifying installation"));
/// assert!(text.starts_with('\n'));
/// ```
#[must_use]
pub fn banner(title: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!("\n{rule}\n  {title}\n{rule}\n")
}

/// Message reported after the copy succeeded.
#[must_use]
pub fn installed_message(installation: &Installation) -> String {
    match installation.method {
        InstallMethod::Direct | InstallMethod::Elevated => {
            format!("Installed in: {}", installation.path)
        }
        InstallMethod::Fallback => format!(
            "Installed in: {} (no permission for the preferred location)",
            installation.path
        ),
    }
}

/// Lines describing what PATH registration did.
#[must_use]
pub fn registration_lines(record: &RegistrationRecord) -> Vec<String> {
    let mut lines: Vec<String> = record
        .appended()
        .map(|surface| match surface {
            Surface::UserPath(_) => format!("PATH updated ({surface})"),
            Surface::Profile(_) => format!("Added to: {surface}"),
        })
        .collect();

    if lines.is_empty() && record.is_registered() {
        lines.push(format!("{} is already in PATH", record.dir));
    }
    lines.extend(
        record
            .failures()
            .map(|(surface, reason)| format!("Warning: could not update {surface}: {reason}")),
    );
    lines
}

/// Instructions for adding `dir` to PATH by hand, used when automatic
/// registration did not succeed.
#[must_use]
pub fn manual_path_instructions(platform: Platform, dir: &Utf8Path) -> String {
    match platform {
        Platform::Windows => format!(
            concat!(
                "Add the following directory to your PATH:\n",
                "  {}\n\n",
                "Or run in PowerShell:\n",
                "  [Environment]::SetEnvironmentVariable(",
                "\"Path\", \"$env:Path;{}\", \"User\")"
            ),
            dir, dir
        ),
        Platform::MacOs | Platform::Linux => format!(
            concat!(
                "Add the following to your shell profile ({}):\n",
                "  {}"
            ),
            profile_hint(platform),
            export_line(dir)
        ),
    }
}

fn profile_hint(platform: Platform) -> String {
    platform
        .shell_profiles()
        .iter()
        .map(|profile| format!("~/{profile}"))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Hint shown when verification could not reach the installed command.
#[must_use]
pub fn verification_hint() -> String {
    format!("Could not verify. Open a new terminal and try: {ARTIFACT_NAME} --version")
}

/// Closing "next steps" lines.
#[must_use]
pub fn next_steps() -> Vec<String> {
    vec![
        "Next steps:".to_owned(),
        "  1. Open a new terminal".to_owned(),
        format!("  2. Run: {ARTIFACT_NAME} --help"),
        format!("  3. Start the mock server: {ARTIFACT_NAME} serve"),
    ]
}

/// The resolved plan shown by `--dry-run`.
///
/// # Examples
///
/// ```
/// use camino::{Utf8Path, Utf8PathBuf};
/// use mockie_installer::output::DryRunInfo;
/// use mockie_installer::platform::Platform;
/// use mockie_installer::resolution::InstallCandidates;
///
/// let candidates = InstallCandidates::single(Utf8PathBuf::from("/usr/local/bin"));
/// let info = DryRunInfo {
///     platform: Platform::Linux,
///     project_dir: Utf8Path::new("/src/mockie"),
///     source: Utf8Path::new("/src/mockie/target/release/mockie"),
///     candidates: &candidates,
///     home_dir: Some(Utf8Path::new("/home/ana")),
///     skip_build: false,
///     skip_path: false,
///     skip_verify: false,
/// };
///
/// let text = info.display_text();
/// assert!(text.contains("Dry run"));
/// assert!(text.contains("/home/ana/.bashrc"));
/// ```
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// Detected platform.
    pub platform: Platform,
    /// Cargo project root.
    pub project_dir: &'a Utf8Path,
    /// Expected build artefact.
    pub source: &'a Utf8Path,
    /// Candidate install directories.
    pub candidates: &'a InstallCandidates,
    /// Home directory used to locate shell profiles.
    pub home_dir: Option<&'a Utf8Path>,
    /// Whether the build step is skipped.
    pub skip_build: bool,
    /// Whether PATH registration is skipped.
    pub skip_path: bool,
    /// Whether verification is skipped.
    pub skip_verify: bool,
}

impl DryRunInfo<'_> {
    /// Format the plan for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            "Dry run - no files will be modified".to_owned(),
            String::new(),
            format!("Platform: {}", self.platform),
            format!("Project directory: {}", self.project_dir),
            format!("Executable: {}", self.source),
            format!("Skip build: {}", self.skip_build),
            format!("Skip PATH update: {}", self.skip_path),
            format!("Skip verification: {}", self.skip_verify),
            String::new(),
            "Install directories (in order):".to_owned(),
        ];
        lines.extend(self.candidates.iter().map(|dir| format!("  - {dir}")));

        lines.push(String::new());
        match self.platform {
            Platform::Windows => {
                lines.push("PATH surface: HKCU\\Environment\\Path".to_owned());
            }
            Platform::MacOs | Platform::Linux => {
                lines.push("Shell profiles (existing files only):".to_owned());
                match self.home_dir {
                    Some(home) => lines.extend(
                        self.platform
                            .shell_profiles()
                            .iter()
                            .map(|profile| format!("  - {}", home.join(profile))),
                    ),
                    None => lines.push("  (home directory unknown)".to_owned()),
                }
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registrar::SurfaceAction;
    use camino::Utf8PathBuf;
    use rstest::rstest;

    fn record(outcomes: Vec<(Surface, SurfaceAction)>) -> RegistrationRecord {
        RegistrationRecord {
            dir: Utf8PathBuf::from("/usr/local/bin"),
            outcomes: outcomes
                .into_iter()
                .map(|(surface, action)| crate::registrar::SurfaceOutcome { surface, action })
                .collect(),
        }
    }

    #[test]
    fn banner_frames_title_with_rules() {
        let text = banner("MOCKIE INSTALLER");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.get(1).map(|l| l.len()), Some(RULE_WIDTH));
        assert_eq!(lines.get(2), Some(&"  MOCKIE INSTALLER"));
    }

    #[test]
    fn registration_lines_report_each_appended_profile() {
        let record = record(vec![
            (
                Surface::Profile(Utf8PathBuf::from("/home/ana/.bashrc")),
                SurfaceAction::Appended,
            ),
            (
                Surface::Profile(Utf8PathBuf::from("/home/ana/.zshrc")),
                SurfaceAction::Failed("read-only file system".to_owned()),
            ),
        ]);

        let lines = registration_lines(&record);

        assert_eq!(lines.first().map(String::as_str), Some("Added to: /home/ana/.bashrc"));
        assert!(lines.iter().any(|l| l.contains("read-only file system")));
    }

    #[test]
    fn registration_lines_report_already_present() {
        let record = record(vec![(
            Surface::UserPath("HKCU\\Environment\\Path".to_owned()),
            SurfaceAction::AlreadyPresent,
        )]);

        let lines = registration_lines(&record);

        assert_eq!(lines, vec!["/usr/local/bin is already in PATH".to_owned()]);
    }

    #[rstest]
    #[case::windows(Platform::Windows, "SetEnvironmentVariable")]
    #[case::macos(Platform::MacOs, "~/.zshrc")]
    #[case::linux(Platform::Linux, "~/.bashrc")]
    fn manual_instructions_fit_platform(#[case] platform: Platform, #[case] expected: &str) {
        let text = manual_path_instructions(platform, Utf8Path::new("/opt/mockie"));
        assert!(text.contains(expected));
        assert!(text.contains("/opt/mockie"));
    }

    #[test]
    fn fallback_install_message_mentions_permissions() {
        let installation = Installation {
            path: Utf8PathBuf::from("C:/Users/ana/AppData/Roaming/mockie/mockie.exe"),
            dir: Utf8PathBuf::from("C:/Users/ana/AppData/Roaming/mockie"),
            method: InstallMethod::Fallback,
        };
        assert!(installed_message(&installation).contains("no permission"));
    }

    #[test]
    fn next_steps_mention_serve() {
        assert!(next_steps().iter().any(|l| l.contains("mockie serve")));
    }
}
