pub mod compose;
pub mod dockerfile;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cmd::quote;
use crate::config::DeploymentConfig;
use crate::error::{DeployError, DeployResult};
use crate::ssh::SshSession;

pub use compose::ComposeDeployer;
pub use dockerfile::DockerfileDeployer;

/// A deployer builds and starts the application container from
/// files already transferred to the remote project directory.
pub trait Deployer {
    /// Short label for logs.
    fn name(&self) -> &'static str;

    /// Build and start the container. No rollback on failure.
    ///
    /// # Errors
    ///
    /// Returns an error if a remote build or start command fails.
    fn deploy(&self, session: &SshSession<'_>, config: &DeploymentConfig) -> DeployResult<()>;
}

/// How the checkout describes its build, in precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildSpec {
    Compose(PathBuf),
    Dockerfile(PathBuf),
}

impl BuildSpec {
    /// A compose manifest wins over a Dockerfile.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::NoBuildSpec`] when `dir` has neither.
    pub fn detect(dir: &Path) -> DeployResult<Self> {
        if let Some(manifest) = crate::compose::find_manifest(dir) {
            return Ok(Self::Compose(manifest));
        }
        let dockerfile = dir.join("Dockerfile");
        if dockerfile.is_file() {
            return Ok(Self::Dockerfile(dockerfile));
        }
        Err(DeployError::NoBuildSpec(dir.display().to_string()))
    }

    #[must_use]
    pub fn deployer(&self) -> Box<dyn Deployer> {
        match self {
            Self::Compose(manifest) => Box::new(ComposeDeployer::new(manifest)),
            Self::Dockerfile(_) => Box::new(DockerfileDeployer::new()),
        }
    }
}

/// Transfer the checkout, pick a build strategy, drop the previous
/// container and start the new one.
///
/// # Errors
///
/// Returns an error if the transfer fails, [`DeployError::NoBuildSpec`]
/// when the checkout has nothing to build, and
/// [`DeployError::DeployFailed`] when a build or start command fails.
pub fn run(session: &SshSession<'_>, config: &DeploymentConfig) -> DeployResult<BuildSpec> {
    transfer(session, config)?;

    let spec = BuildSpec::detect(&config.local_dir())?;
    let deployer = spec.deployer();
    info!("Build strategy: {}", deployer.name());

    remove_container(session, config);

    deployer
        .deploy(session, config)
        .map_err(|e| match e {
            DeployError::CommandFailed { command, stderr, .. } => {
                DeployError::DeployFailed(format!("{command}: {stderr}"))
            }
            other => other,
        })?;

    info!("Container {} started", config.container);
    Ok(spec)
}

/// Copy the local checkout into the remote home directory, where it
/// lands as `~/<project>`.
///
/// # Errors
///
/// Returns an error if `scp` fails.
pub fn transfer(session: &SshSession<'_>, config: &DeploymentConfig) -> DeployResult<()> {
    info!(
        "Transferring {} to {}:{}",
        config.local_dir().display(),
        session.host().destination(),
        config.remote_dir()
    );
    session.copy_to(&config.local_dir(), ".")
}

/// Stop and remove any container with the configured name. Errors
/// are ignored.
pub fn remove_container(session: &SshSession<'_>, config: &DeploymentConfig) {
    let sudo = session.host().sudo();
    let name = quote(&config.container);
    let script = format!(
        "{sudo}docker stop {name} >/dev/null 2>&1 || true; \
         {sudo}docker rm {name} >/dev/null 2>&1 || true"
    );
    if let Err(e) = session.status(&script) {
        debug!("removing old container {name}: {e}");
    }
}
