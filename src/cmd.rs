use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{DeployError, DeployResult};
use crate::ssh::RemoteHost;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    Plain(String),
    // Wiped when the command is dropped.
    Secret(Zeroizing<String>),
}

impl Arg {
    fn raw(&self) -> &str {
        match self {
            Self::Plain(s) => s,
            Self::Secret(s) => s.as_str(),
        }
    }
}

/// A program invocation: name, arguments, and optional working
/// directory and environment.
///
/// Arguments added with [`Command::secret_arg`] are passed to the
/// program unchanged but rendered as `***` by `Display` and `Debug`,
/// and their buffers are zeroed on drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: String,
    args: Vec<Arg>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl Command {
    #[must_use]
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
        }
    }

    /// A `sh -c` invocation of a script.
    #[must_use]
    pub fn shell(script: &str) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Plain(arg.into()));
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|a| Arg::Plain(a.into())));
        self
    }

    #[must_use]
    pub fn secret_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Secret(Zeroizing::new(arg.into())));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Raw argument values, secrets included.
    #[must_use]
    pub fn argv(&self) -> Vec<&str> {
        self.args.iter().map(Arg::raw).collect()
    }

    #[must_use]
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// The last argument of a `sh -c` invocation, if this is one.
    #[must_use]
    pub fn script(&self) -> Option<&str> {
        match self.argv().as_slice() {
            ["-c", script] if self.program == "sh" => Some(*script),
            _ => None,
        }
    }

    /// Render the invocation as a single shell-quoted string with
    /// secrets included, for handing to a remote shell.
    #[must_use]
    pub fn to_shell_string(&self) -> String {
        let mut parts = vec![quote(&self.program)];
        parts.extend(self.args.iter().map(|a| quote(a.raw())));
        parts.join(" ")
    }

    /// Replace every secret argument value found in `text` with
    /// `***`.
    #[must_use]
    pub fn redact(&self, text: &str) -> String {
        let secrets = self.args.iter().filter_map(|a| match a {
            Arg::Secret(s) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        });
        secrets.fold(text.to_string(), |out, secret| out.replace(secret, "***"))
    }

    fn has_secrets(&self) -> bool {
        self.args.iter().any(|a| matches!(a, Arg::Secret(_)))
    }

    /// Wrap this command so it runs on `host` over SSH.
    #[must_use]
    pub fn on(&self, host: &RemoteHost) -> Self {
        let mut wrapped = Self::new("ssh").args(host.ssh_options());
        wrapped = wrapped.arg(host.destination());
        let inner = self.to_shell_string();
        if self.has_secrets() {
            wrapped.secret_arg(inner)
        } else {
            wrapped.arg(inner)
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote(&self.program))?;
        for arg in &self.args {
            match arg {
                Arg::Plain(s) => write!(f, " {}", quote(s))?,
                Arg::Secret(_) => f.write_str(" ***")?,
            }
        }
        Ok(())
    }
}

/// Where a command runs.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Local,
    Remote(&'a RemoteHost),
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn ok(stdout: &str) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    #[must_use]
    pub fn failed(code: i32, stderr: &str) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Turn a non-zero exit into [`DeployError::CommandFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::CommandFailed`] unless the exit code is
    /// zero.
    pub fn check(self, command: &Command) -> DeployResult<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(DeployError::CommandFailed {
                command: command.to_string(),
                code: self.code,
                stderr: command.redact(self.stderr.trim()),
            })
        }
    }
}

/// Executes commands against a target. The only seam between the
/// deployment stages and the outside world, so tests can swap in a
/// scripted implementation.
pub trait CommandRunner {
    /// Run `command` on `target` to completion and capture its
    /// output. A non-zero exit is reported through
    /// [`CommandOutput::code`], not as an error; errors mean the
    /// command could not be started at all.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::CommandNotFound`] when the program is
    /// not installed, or an I/O error when it cannot be spawned.
    fn run(&self, target: Target<'_>, command: &Command) -> DeployResult<CommandOutput>;

    /// Run and fail on a non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`CommandRunner::run`], and
    /// [`DeployError::CommandFailed`] on a non-zero exit.
    fn run_checked(&self, target: Target<'_>, command: &Command) -> DeployResult<CommandOutput> {
        self.run(target, command)?.check(command)
    }
}

/// Runs commands as child processes of this one. Remote commands
/// go through the local `ssh` client.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn spawn(command: &Command) -> DeployResult<CommandOutput> {
        debug!(target: "shipyard::cmd", "$ {command}");

        let mut process = std::process::Command::new(&command.program);
        process
            .args(command.argv())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &command.cwd {
            process.current_dir(dir);
        }
        for (key, value) in &command.env {
            process.env(key, value);
        }

        let output = process.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DeployError::CommandNotFound(command.program.clone())
            } else {
                DeployError::Io(e)
            }
        })?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };

        if !result.stdout.is_empty() {
            debug!(target: "shipyard::cmd", "stdout: {}", command.redact(&result.stdout));
        }
        if !result.stderr.is_empty() {
            debug!(target: "shipyard::cmd", "stderr: {}", command.redact(&result.stderr));
        }
        debug!(target: "shipyard::cmd", "exit: {:?}", result.code);

        Ok(result)
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, target: Target<'_>, command: &Command) -> DeployResult<CommandOutput> {
        match target {
            Target::Local => Self::spawn(command),
            Target::Remote(host) => Self::spawn(&command.on(host)),
        }
    }
}

/// Check if a program exists on the local PATH.
pub fn command_exists(runner: &dyn CommandRunner, program: &str) -> bool {
    runner
        .run(Target::Local, &Command::new("which").arg(program))
        .is_ok_and(|out| out.success())
}

/// Quote a word for a POSIX shell. Words made only of safe
/// characters are returned as is.
#[must_use]
pub fn quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,~".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}
