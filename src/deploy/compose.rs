use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::cmd::quote;
use crate::compose;
use crate::config::DeploymentConfig;
use crate::deploy::Deployer;
use crate::error::{DeployError, DeployResult};
use crate::ssh::SshSession;

/// Build and start every service in the project's compose manifest,
/// detached.
pub struct ComposeDeployer {
    manifest: PathBuf,
}

impl ComposeDeployer {
    #[must_use]
    pub fn new(manifest: &Path) -> Self {
        Self {
            manifest: manifest.to_path_buf(),
        }
    }

    fn manifest_name(&self) -> String {
        self.manifest
            .file_name()
            .map_or_else(|| "docker-compose.yml".to_string(), |n| n.to_string_lossy().into_owned())
    }

    /// Log the declared services. The remote compose tool has the
    /// final say on validity, so a parse failure only warns.
    fn describe(&self) {
        let services = std::fs::read_to_string(&self.manifest)
            .map_err(DeployError::from)
            .and_then(|content| compose::service_names(&content));
        match services {
            Ok(names) => info!("Compose services: {}", names.join(", ")),
            Err(e) => warn!("Could not parse {}: {e}", self.manifest.display()),
        }
    }

    /// Prefer the compose plugin, fall back to the standalone binary.
    #[must_use]
    pub fn up_script(sudo: &str, remote_dir: &str, manifest: &str) -> String {
        let manifest = quote(manifest);
        format!(
            "cd {remote_dir} && \
             if {sudo}docker compose version >/dev/null 2>&1; \
             then {sudo}docker compose -f {manifest} up -d --build; \
             else {sudo}docker-compose -f {manifest} up -d --build; fi"
        )
    }
}

impl Deployer for ComposeDeployer {
    fn name(&self) -> &'static str {
        "docker compose"
    }

    fn deploy(&self, session: &SshSession<'_>, config: &DeploymentConfig) -> DeployResult<()> {
        self.describe();

        info!("Starting services with {}...", self.manifest_name());
        session.exec(&Self::up_script(
            session.host().sudo(),
            &config.remote_dir(),
            &self.manifest_name(),
        ))?;
        Ok(())
    }
}
