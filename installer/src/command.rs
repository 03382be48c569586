//! External command execution.
//!
//! Every subprocess the installer spawns (the build tool, the elevated copy,
//! `reg.exe`, the verification call) goes through [`CommandExecutor`], so the
//! whole workflow can be driven by a stub in tests. The runner only executes
//! and captures; deciding whether a non-zero exit is fatal is the caller's job.

use crate::error::{InstallerError, Result};
use log::{debug, info};
use std::fmt;
use std::process::{Command, Output};

/// Abstraction for running external commands.
#[cfg_attr(test, mockall::automock)]
pub trait CommandExecutor {
    /// Runs a command with arguments and returns the captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mockie_installer::command::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("cargo", &["--version"])?;
    /// assert!(output.status.success());
    /// # Ok::<(), mockie_installer::error::InstallerError>(())
    /// ```
    fn run<'a>(&self, cmd: &str, args: &[&'a str]) -> Result<Output>;
}

/// Executes commands on the host system.
///
/// Blocks until the child exits. Standard input is inherited, so interactive
/// prompts such as a `sudo` password request still reach the user.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<Output> {
        Command::new(cmd)
            .args(args)
            .output()
            .map_err(InstallerError::from)
    }
}

/// Structured outcome of one external command.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a command result must be inspected for failure"]
pub struct CommandResult {
    /// Exit code, or `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
}

impl CommandResult {
    /// Returns `true` when the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// The most useful diagnostic text: trimmed stderr, or stdout when stderr
    /// is empty.
    #[must_use]
    pub fn diagnostic(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

impl From<Output> for CommandResult {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// A command line to run: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
}

impl Invocation {
    /// Create an invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Run an invocation, logging `description` first.
///
/// # Errors
///
/// Returns [`InstallerError::Io`] if the process could not be spawned. A
/// non-zero exit is reported through [`CommandResult::success`], not as an
/// error.
///
/// # Examples
///
/// ```no_run
/// use mockie_installer::command::{Invocation, SystemCommandExecutor, run_command};
///
/// let result = run_command(
///     &SystemCommandExecutor,
///     &Invocation::new("cargo").arg("--version"),
///     "Checking cargo",
/// )?;
/// assert!(result.success());
/// # Ok::<(), mockie_installer::error::InstallerError>(())
/// ```
pub fn run_command(
    executor: &dyn CommandExecutor,
    invocation: &Invocation,
    description: &str,
) -> Result<CommandResult> {
    info!("{description}");
    debug!("running `{invocation}`");
    let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
    let result = CommandResult::from(executor.run(&invocation.program, &args)?);
    debug!("`{invocation}` exited with {:?}", result.code);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{failure_output, output_with_stdout, success_output};

    #[test]
    fn run_command_passes_program_and_args() {
        let mut executor = MockCommandExecutor::new();
        executor
            .expect_run()
            .withf(|cmd, args| cmd == "cargo" && args == ["build", "--release"])
            .times(1)
            .returning(|_, _| Ok(success_output()));

        let invocation = Invocation::new("cargo").args(["build", "--release"]);
        let result = run_command(&executor, &invocation, "Compiling...").expect("spawn");

        assert!(result.success());
    }

    #[test]
    fn non_zero_exit_is_a_result_not_an_error() {
        let mut executor = MockCommandExecutor::new();
        executor
            .expect_run()
            .times(1)
            .returning(|_, _| Ok(failure_output("permission denied")));

        let result = run_command(&executor, &Invocation::new("sudo"), "Copying")
            .expect("runner should not decide fatality");

        assert!(!result.success());
        assert_eq!(result.diagnostic(), "permission denied");
    }

    #[test]
    fn spawn_failure_is_an_io_error() {
        let mut executor = MockCommandExecutor::new();
        executor
            .expect_run()
            .times(1)
            .returning(|_, _| Err(std::io::Error::other("no such program").into()));

        let err = run_command(&executor, &Invocation::new("missing"), "Running")
            .expect_err("spawn failure should propagate");

        assert!(matches!(err, InstallerError::Io(_)));
    }

    #[test]
    fn diagnostic_falls_back_to_stdout() {
        let result = CommandResult::from(output_with_stdout(1, "  only stdout \n"));
        assert_eq!(result.diagnostic(), "only stdout");
    }

    #[test]
    fn invocation_display_joins_arguments() {
        let invocation = Invocation::new("sudo").args(["install", "-m", "755"]);
        assert_eq!(invocation.to_string(), "sudo install -m 755");
        assert_eq!(invocation.program(), "sudo");
    }
}
