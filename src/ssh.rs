use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use crate::cmd::{Command, CommandOutput, CommandRunner, Target};
use crate::error::{DeployError, DeployResult};

/// How the SSH client treats unknown or changed host keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostKeyPolicy {
    /// Only hosts already in `known_hosts` are accepted.
    Strict,
    /// New hosts are recorded on first contact; changed keys are
    /// refused.
    #[default]
    AcceptNew,
    /// No verification at all. Exposes the connection to
    /// man-in-the-middle attacks.
    Disabled,
}

impl HostKeyPolicy {
    #[must_use]
    pub const fn as_option(self) -> &'static str {
        match self {
            Self::Strict => "StrictHostKeyChecking=yes",
            Self::AcceptNew => "StrictHostKeyChecking=accept-new",
            Self::Disabled => "StrictHostKeyChecking=no",
        }
    }
}

impl fmt::Display for HostKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::AcceptNew => "accept-new",
            Self::Disabled => "disabled",
        })
    }
}

/// Connection parameters for the remote host. Every remote
/// operation opens and closes its own connection with these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHost {
    pub host: String,
    pub user: String,
    pub key: Option<PathBuf>,
    pub connect_timeout: Duration,
    pub host_key_policy: HostKeyPolicy,
}

impl RemoteHost {
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(host: &str, user: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            key: None,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            host_key_policy: HostKeyPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.key = Some(key_path.into());
        self
    }

    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// `sudo ` for ordinary users, nothing for root.
    #[must_use]
    pub fn sudo(&self) -> &'static str {
        if self.user == "root" { "" } else { "sudo " }
    }

    /// Options shared by `ssh` and `scp`.
    #[must_use]
    pub fn ssh_options(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            self.host_key_policy.as_option().to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];
        if self.host_key_policy == HostKeyPolicy::Disabled {
            args.push("-o".to_string());
            args.push("UserKnownHostsFile=/dev/null".to_string());
        }
        if let Some(key) = &self.key {
            args.push("-i".to_string());
            args.push(key.to_string_lossy().into_owned());
        }
        args
    }
}

/// Remote execution and file transfer bound to one host and one
/// command runner.
pub struct SshSession<'a> {
    host: &'a RemoteHost,
    runner: &'a dyn CommandRunner,
}

impl<'a> SshSession<'a> {
    #[must_use]
    pub fn new(host: &'a RemoteHost, runner: &'a dyn CommandRunner) -> Self {
        if host.host_key_policy == HostKeyPolicy::Disabled {
            debug!("host key verification disabled for {}", host.host);
        }
        Self { host, runner }
    }

    #[must_use]
    pub const fn host(&self) -> &RemoteHost {
        self.host
    }

    /// Execute a shell script on the remote host. Fails on a
    /// non-zero exit.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::CommandFailed`] on a non-zero exit, or
    /// an error if `ssh` cannot be started.
    pub fn exec(&self, script: &str) -> DeployResult<String> {
        let command = Command::shell(script);
        let output = self.runner.run_checked(Target::Remote(self.host), &command)?;
        Ok(output.stdout)
    }

    /// Execute a shell script on the remote host and hand back the
    /// output whatever the exit status.
    ///
    /// # Errors
    ///
    /// Returns an error only if `ssh` cannot be started.
    pub fn status(&self, script: &str) -> DeployResult<CommandOutput> {
        self.runner
            .run(Target::Remote(self.host), &Command::shell(script))
    }

    /// Recursively copy a local path to a remote path.
    ///
    /// # Errors
    ///
    /// Returns an error if `scp` fails or cannot be started.
    pub fn copy_to(&self, local: &Path, remote: &str) -> DeployResult<()> {
        let command = Command::new("scp")
            .args(self.host.ssh_options())
            .arg("-r")
            .arg(local.to_string_lossy())
            .arg(format!("{}:{remote}", self.host.destination()));
        self.runner.run_checked(Target::Local, &command)?;
        Ok(())
    }

    /// One connection attempt bounded by the connect timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::SshFailed`] when the host cannot be
    /// reached or refuses the login.
    pub fn check_connection(&self) -> DeployResult<()> {
        match self.exec("echo ok") {
            Ok(_) => Ok(()),
            Err(DeployError::CommandFailed { stderr, .. }) => {
                warn!("cannot reach {}: {stderr}", self.host.destination());
                Err(DeployError::SshFailed(format!(
                    "{} unreachable within {}s: {stderr}",
                    self.host.destination(),
                    self.host.connect_timeout.as_secs()
                )))
            }
            Err(e) => Err(e),
        }
    }
}
