use std::path::Path;

use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::cmd::{Command, CommandRunner, Target};
use crate::config::DeploymentConfig;
use crate::error::{DeployError, DeployResult};

/// What the synchronizer did to the local checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Cloned,
    Updated,
}

// Fragments git prints when the remote refuses the URL or token.
const ACCESS_DENIED: [&str; 8] = [
    "authentication failed",
    "could not read username",
    "could not read password",
    "terminal prompts disabled",
    "repository not found",
    "invalid username or password",
    "the requested url returned error: 401",
    "the requested url returned error: 403",
];

/// Bring `<workdir>/<project>` to the tip of the configured branch.
///
/// An existing directory is checked out and fast-forwarded; a
/// missing one is cloned with only the target branch. The token is
/// only ever passed on the command line: after a clone the `origin`
/// remote is reset to the plain URL so `.git/config` never holds it.
///
/// # Errors
///
/// Returns [`DeployError::RepoAccess`] when git rejects the URL or
/// token, and a command error for any other git failure.
pub fn sync(runner: &dyn CommandRunner, config: &DeploymentConfig) -> DeployResult<SyncAction> {
    let dir = config.local_dir();
    let auth_url = config.authenticated_url();

    let action = if dir.is_dir() {
        info!("Updating existing checkout {} ({})", dir.display(), config.branch);
        git(runner, in_dir(&dir).args(["checkout", config.branch.as_str()]))?;
        git(
            runner,
            in_dir(&dir)
                .args(["pull", "--ff-only"])
                .secret_arg(auth_url.expose_secret())
                .arg(config.branch.as_str()),
        )?;
        SyncAction::Updated
    } else {
        info!("Cloning {} ({})", config.repo_url, config.branch);
        git(
            runner,
            Command::new("git")
                .args(["clone", "--branch", config.branch.as_str(), "--single-branch"])
                .secret_arg(auth_url.expose_secret())
                .arg(dir.to_string_lossy()),
        )?;
        git(
            runner,
            in_dir(&dir).args(["remote", "set-url", "origin", config.repo_url.as_str()]),
        )?;
        SyncAction::Cloned
    };

    verify_checkout(runner, &dir)?;
    info!("Repository ready at {}", dir.display());
    Ok(action)
}

fn verify_checkout(runner: &dyn CommandRunner, dir: &Path) -> DeployResult<()> {
    let output = git(runner, in_dir(dir).args(["rev-parse", "--is-inside-work-tree"]))?;
    if output.trim() == "true" {
        Ok(())
    } else {
        Err(DeployError::RepoSync(format!(
            "{} is not a git work tree",
            dir.display()
        )))
    }
}

fn in_dir(dir: &Path) -> Command {
    Command::new("git").arg("-C").arg(dir.to_string_lossy())
}

fn git(runner: &dyn CommandRunner, command: Command) -> DeployResult<String> {
    let command = command.env("GIT_TERMINAL_PROMPT", "0");
    let output = runner.run(Target::Local, &command)?;
    if output.success() {
        return Ok(output.stdout);
    }

    let stderr = command.redact(output.stderr.trim());
    warn!("{command} failed: {stderr}");
    Err(classify(&command, &stderr))
}

/// Tell an access problem (bad URL or token) apart from any other
/// git failure.
fn classify(command: &Command, stderr: &str) -> DeployError {
    let lower = stderr.to_lowercase();
    if ACCESS_DENIED.iter().any(|needle| lower.contains(needle)) {
        DeployError::RepoAccess(stderr.to_string())
    } else {
        DeployError::RepoSync(format!("{command}: {stderr}"))
    }
}
