use std::thread;

use serde::Deserialize;
use tracing::{info, warn};

use crate::cmd::{quote, Command, CommandRunner, Target};
use crate::config::DeploymentConfig;
use crate::error::{DeployError, DeployResult};
use crate::ssh::SshSession;

/// HTTP statuses that count as a healthy response.
pub const HEALTHY_STATUSES: [u16; 3] = [200, 301, 302];

const CHECK_TIMEOUT_SECS: u32 = 10;

/// One row of `docker ps --format '{{json .}}'`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ContainerSummary {
    #[serde(rename = "ID")]
    pub id: String,
    pub names: String,
    pub image: String,
    pub state: String,
    pub status: String,
}

/// Outcome of one HTTP check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCheck {
    pub url: String,
    /// `None` when no HTTP response came back at all.
    pub status: Option<u16>,
}

impl HttpCheck {
    #[must_use]
    pub fn healthy(&self) -> bool {
        self.status.is_some_and(|s| HEALTHY_STATUSES.contains(&s))
    }

    fn describe(&self) -> String {
        self.status
            .map_or_else(|| "no response".to_string(), |s| format!("HTTP {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub container: ContainerSummary,
    pub app: HttpCheck,
    pub proxy: HttpCheck,
}

impl VerificationReport {
    /// Human-readable warnings for every failed HTTP check.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.app.healthy() {
            warnings.push(format!(
                "application at {} answered {}; it may still be starting",
                self.app.url,
                self.app.describe()
            ));
        }
        if !self.proxy.healthy() {
            warnings.push(format!(
                "{} answered {}; a firewall or NAT may be in the way",
                self.proxy.url,
                self.proxy.describe()
            ));
        }
        warnings
    }
}

/// Check the deployment.
///
/// Only a missing container is fatal. After the grace delay the
/// application port is checked from the remote host, then nginx is
/// checked from here on port 80; both only warn on failure.
///
/// # Errors
///
/// Returns [`DeployError::ContainerNotRunning`] when no container
/// with the derived name is listed, and an error when `docker ps`
/// fails or prints rows that do not decode.
pub fn verify(
    session: &SshSession<'_>,
    runner: &dyn CommandRunner,
    config: &DeploymentConfig,
) -> DeployResult<VerificationReport> {
    let container = running_container(session, config)?;
    info!("Container {} is {}", container.names, container.status);

    if !config.health_grace.is_zero() {
        info!("Waiting {}s for the application to start...", config.health_grace.as_secs());
        thread::sleep(config.health_grace);
    }

    let app_url = format!("http://localhost:{}", config.port);
    let app = HttpCheck {
        status: session
            .status(&curl_script(&app_url))
            .ok()
            .and_then(|out| parse_status(&out.stdout)),
        url: app_url,
    };
    report_check("Application", &app);

    let proxy_url = format!("http://{}", config.remote.host);
    let proxy = HttpCheck {
        status: runner
            .run(Target::Local, &curl_command(&proxy_url))
            .ok()
            .and_then(|out| parse_status(&out.stdout)),
        url: proxy_url,
    };
    report_check("Reverse proxy", &proxy);

    Ok(VerificationReport {
        container,
        app,
        proxy,
    })
}

fn running_container(
    session: &SshSession<'_>,
    config: &DeploymentConfig,
) -> DeployResult<ContainerSummary> {
    let output = session.exec(&format!(
        "{}docker ps --filter {} --format '{{{{json .}}}}'",
        session.host().sudo(),
        quote(&format!("name={}", config.container))
    ))?;

    parse_containers(&output)?
        .into_iter()
        .find(|c| c.names.split(',').any(|n| n.contains(config.container.as_str())))
        .ok_or_else(|| DeployError::ContainerNotRunning(config.container.clone()))
}

/// Decode `docker ps` JSON rows, one object per line.
///
/// # Errors
///
/// Returns [`DeployError::Json`] for a row that is not a container
/// object.
pub fn parse_containers(output: &str) -> DeployResult<Vec<ContainerSummary>> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(DeployError::from))
        .collect()
}

/// Parse curl's `%{http_code}`; `000` means no response.
#[must_use]
pub fn parse_status(output: &str) -> Option<u16> {
    output.trim().parse::<u16>().ok().filter(|s| *s != 0)
}

fn curl_script(url: &str) -> String {
    format!("curl -s -o /dev/null -w '%{{http_code}}' --max-time {CHECK_TIMEOUT_SECS} {url}")
}

fn curl_command(url: &str) -> Command {
    Command::new("curl")
        .args(["-s", "-o", "/dev/null", "-w", "%{http_code}", "--max-time"])
        .arg(CHECK_TIMEOUT_SECS.to_string())
        .arg(url)
}

fn report_check(label: &str, check: &HttpCheck) {
    if check.healthy() {
        info!("{label} check passed ({} -> {})", check.url, check.describe());
    } else {
        warn!("{label} check failed ({} -> {})", check.url, check.describe());
    }
}
