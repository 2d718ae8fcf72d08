use std::fmt;

use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::ssh::SshSession;

/// Software the remote host needs before a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Docker,
    Compose,
    Nginx,
}

impl Component {
    /// Provisioning order.
    pub const ALL: [Self; 3] = [Self::Docker, Self::Compose, Self::Nginx];

    /// Script that exits zero when the component is present.
    #[must_use]
    pub const fn presence_check(self) -> &'static str {
        match self {
            Self::Docker => "command -v docker >/dev/null 2>&1",
            Self::Compose => {
                "docker compose version >/dev/null 2>&1 || command -v docker-compose >/dev/null 2>&1"
            }
            Self::Nginx => "command -v nginx >/dev/null 2>&1 || test -x /usr/sbin/nginx",
        }
    }

    /// Script that refreshes the package index and installs the
    /// component with apt.
    #[must_use]
    pub fn install(self, sudo: &str) -> String {
        let apt = format!("{sudo}env DEBIAN_FRONTEND=noninteractive apt-get");
        let install = match self {
            Self::Docker => format!("{apt} install -y docker.io"),
            Self::Compose => {
                format!("({apt} install -y docker-compose-v2 || {apt} install -y docker-compose)")
            }
            Self::Nginx => format!("{apt} install -y nginx"),
        };
        format!("{apt} update -y && {install}")
    }

    /// systemd unit to enable and restart after provisioning.
    #[must_use]
    pub const fn service(self) -> Option<&'static str> {
        match self {
            Self::Docker => Some("docker"),
            Self::Compose => None,
            Self::Nginx => Some("nginx"),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Docker => "Docker",
            Self::Compose => "Docker Compose",
            Self::Nginx => "Nginx",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    AlreadyInstalled,
    Installed,
}

/// Install whatever is missing, in [`Component::ALL`] order, then
/// enable and restart the Docker and Nginx services. The first
/// failure aborts; nothing is retried.
///
/// # Errors
///
/// Returns [`DeployError::ProvisionFailed`] naming the component or
/// service whose install or restart failed.
pub fn provision(session: &SshSession<'_>) -> DeployResult<Vec<(Component, ComponentState)>> {
    let sudo = session.host().sudo();
    let mut report = Vec::with_capacity(Component::ALL.len());

    for component in Component::ALL {
        if session.status(component.presence_check())?.success() {
            info!("{component} already installed");
            report.push((component, ComponentState::AlreadyInstalled));
            continue;
        }

        info!("Installing {component}...");
        session
            .exec(&component.install(sudo))
            .map_err(|e| DeployError::ProvisionFailed(format!("{component}: {e}")))?;
        info!("{component} installed");
        report.push((component, ComponentState::Installed));
    }

    for service in Component::ALL.iter().filter_map(|c| c.service()) {
        session
            .exec(&format!(
                "{sudo}systemctl enable {service} && {sudo}systemctl restart {service}"
            ))
            .map_err(|e| DeployError::ProvisionFailed(format!("starting {service}: {e}")))?;
        info!("{service} service enabled and running");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_uses_sudo_prefix() {
        let script = Component::Nginx.install("sudo ");

        assert_eq!(
            script,
            "sudo env DEBIAN_FRONTEND=noninteractive apt-get update -y && \
             sudo env DEBIAN_FRONTEND=noninteractive apt-get install -y nginx"
        );
    }

    #[test]
    fn every_install_refreshes_the_index_first() {
        for component in Component::ALL {
            let script = component.install("");

            assert!(
                script.starts_with("env DEBIAN_FRONTEND=noninteractive apt-get update -y && "),
                "{component}: {script}"
            );
        }
    }

    #[test]
    fn compose_alternatives_run_after_update() {
        let script = Component::Compose.install("");

        assert!(script.ends_with(
            "&& (env DEBIAN_FRONTEND=noninteractive apt-get install -y docker-compose-v2 || \
             env DEBIAN_FRONTEND=noninteractive apt-get install -y docker-compose)"
        ));
    }

    #[test]
    fn install_as_root_has_no_sudo() {
        let script = Component::Docker.install("");

        assert!(script.starts_with("env DEBIAN_FRONTEND"));
        assert!(script.contains("install -y docker.io"));
    }

    #[test]
    fn only_daemons_have_services() {
        let services: Vec<_> = Component::ALL.iter().filter_map(|c| c.service()).collect();

        assert_eq!(services, vec!["docker", "nginx"]);
    }
}
