use tracing::info;

use crate::cmd::quote;
use crate::config::DeploymentConfig;
use crate::deploy::Deployer;
use crate::error::DeployResult;
use crate::ssh::SshSession;

/// Build a tagged image from the project's `Dockerfile` and run one
/// detached container publishing the application port.
pub struct DockerfileDeployer;

impl DockerfileDeployer {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn build_script(sudo: &str, config: &DeploymentConfig) -> String {
        format!(
            "cd {} && {sudo}docker build -t {} .",
            config.remote_dir(),
            quote(&config.image())
        )
    }

    #[must_use]
    pub fn run_script(sudo: &str, config: &DeploymentConfig) -> String {
        format!(
            "{sudo}docker run -d --name {name} --restart unless-stopped -p {port}:{port} {image}",
            name = quote(&config.container),
            port = config.port,
            image = quote(&config.image())
        )
    }
}

impl Default for DockerfileDeployer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deployer for DockerfileDeployer {
    fn name(&self) -> &'static str {
        "docker build"
    }

    fn deploy(&self, session: &SshSession<'_>, config: &DeploymentConfig) -> DeployResult<()> {
        let sudo = session.host().sudo();

        info!("Building image {}...", config.image());
        session.exec(&Self::build_script(sudo, config))?;

        info!("Running container {}...", config.container);
        session.exec(&Self::run_script(sudo, config))?;
        Ok(())
    }
}
