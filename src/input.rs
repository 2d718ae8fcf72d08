use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::config::DeploymentConfig;
use crate::error::{DeployError, DeployResult};
use crate::prompt::Prompter;
use crate::ssh::{HostKeyPolicy, RemoteHost};
use crate::validate;

/// Attempts allowed for re-prompted answers (URL, IP, key path).
pub const MAX_ATTEMPTS: u32 = 5;

pub const DEFAULT_KEY_PATH: &str = "~/.ssh/id_rsa";

/// Answers known before prompting, from flags, environment or a
/// config file. A preset answer is validated once and never
/// re-prompted.
#[derive(Debug, Default)]
pub struct Presets {
    pub repo: Option<String>,
    pub token: Option<SecretString>,
    pub branch: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub key: Option<String>,
    pub port: Option<String>,
}

/// Settings that are never prompted for.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub workdir: PathBuf,
    pub health_grace: Duration,
    pub connect_timeout: Duration,
    pub host_key_policy: HostKeyPolicy,
    pub assume_yes: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("."),
            health_grace: DeploymentConfig::DEFAULT_HEALTH_GRACE,
            connect_timeout: RemoteHost::DEFAULT_CONNECT_TIMEOUT,
            host_key_policy: HostKeyPolicy::default(),
            assume_yes: false,
        }
    }
}

/// Collect and validate every deployment input in a fixed order:
/// repository URL, token, branch, user, IP, key path, port.
///
/// # Errors
///
/// Returns [`DeployError::InvalidInput`] for an invalid preset, an
/// empty token, username or bad port, or once [`MAX_ATTEMPTS`]
/// answers to a re-prompted question were rejected.
pub fn collect(
    prompter: &dyn Prompter,
    presets: Presets,
    options: &RunOptions,
) -> DeployResult<DeploymentConfig> {
    let repo_url = resolve(
        prompter,
        presets.repo.as_deref(),
        "Git repository URL (https://...git)",
        None,
        validate::repo_url,
    )?;

    let token = match presets.token {
        Some(token) => token,
        None => prompter.secret("Personal access token")?,
    };
    if token.expose_secret().is_empty() {
        return Err(DeployError::InvalidInput("access token must not be empty".into()));
    }

    let branch = match presets.branch {
        Some(branch) => validate::branch(&branch),
        None => validate::branch(&prompter.input("Branch", Some("main"))?),
    };

    let user = match presets.user {
        Some(user) => user,
        None => prompter.input("Remote SSH username", None)?,
    };
    let user = validate::username(&user)?;

    let host = resolve(
        prompter,
        presets.host.as_deref(),
        "Remote server IP address",
        None,
        validate::ip_address,
    )?;

    let key = resolve(
        prompter,
        presets.key.as_deref(),
        "SSH private key path",
        Some(DEFAULT_KEY_PATH),
        validate::key_path,
    )?;

    let port = match presets.port {
        Some(port) => port,
        None => prompter.input("Application port", None)?,
    };
    let port = validate::port(&port)?;

    let remote = RemoteHost::new(&host, &user)
        .with_key(key)
        .connect_timeout(options.connect_timeout)
        .host_key_policy(options.host_key_policy);

    Ok(DeploymentConfig::new(&repo_url, remote)
        .branch(&branch)
        .token(token)
        .port(port)
        .workdir(&options.workdir)
        .health_grace(options.health_grace))
}

/// Show the collected configuration and ask whether to proceed.
///
/// # Errors
///
/// Returns an error if the prompt fails.
pub fn confirm(prompter: &dyn Prompter, config: &DeploymentConfig, assume_yes: bool) -> DeployResult<bool> {
    info!("Repository:  {} ({})", config.repo_url, config.branch);
    info!("Project:     {}", config.project);
    info!("Container:   {}", config.container);
    info!("Remote:      {}", config.remote.destination());
    info!("App port:    {}", config.port);
    info!("Host keys:   {}", config.remote.host_key_policy);
    if config.remote.host_key_policy == HostKeyPolicy::Disabled {
        warn!("Host key verification is disabled for this run");
    }

    if assume_yes {
        return Ok(true);
    }
    prompter.confirm("Proceed with deployment?")
}

/// Validate a preset once, or prompt until a valid answer is given
/// or [`MAX_ATTEMPTS`] is reached.
fn resolve<T>(
    prompter: &dyn Prompter,
    preset: Option<&str>,
    prompt: &str,
    default: Option<&str>,
    validate: impl Fn(&str) -> DeployResult<T>,
) -> DeployResult<T> {
    if let Some(value) = preset {
        return validate(value);
    }

    for attempt in 1..=MAX_ATTEMPTS {
        let answer = prompter.input(prompt, default)?;
        match validate(&answer) {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("{e} (attempt {attempt}/{MAX_ATTEMPTS})");
                prompter.error(&e.to_string());
            }
        }
    }

    Err(DeployError::InvalidInput(format!(
        "{prompt}: no valid answer after {MAX_ATTEMPTS} attempts"
    )))
}
