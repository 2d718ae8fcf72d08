use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::cmd::quote;
use crate::error::DeployResult;
use crate::ssh::RemoteHost;

/// Everything a deployment run needs, collected up front and
/// passed by reference to each stage.
///
/// # Example
///
/// ```
/// use shipyard::{DeploymentConfig, RemoteHost};
///
/// let config = DeploymentConfig::new(
///     "https://example.com/myapp.git",
///     RemoteHost::new("203.0.113.7", "ubuntu"),
/// )
/// .port(3000);
///
/// assert_eq!(config.branch, "main");
/// assert_eq!(config.project, "myapp");
/// assert_eq!(config.container, "myapp_app");
/// assert_eq!(config.remote_dir(), "~/myapp");
/// ```
#[derive(Debug)]
pub struct DeploymentConfig {
    pub repo_url: String,
    pub branch: String,
    pub project: String,
    pub container: String,
    pub remote: RemoteHost,
    pub port: u16,
    /// Access token; `None` once cleared.
    pub token: Option<SecretString>,
    pub workdir: PathBuf,
    pub health_grace: Duration,
}

impl DeploymentConfig {
    pub const DEFAULT_PORT: u16 = 3000;
    pub const DEFAULT_HEALTH_GRACE: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(repo_url: &str, remote: RemoteHost) -> Self {
        let project = project_name(repo_url);
        Self {
            repo_url: repo_url.to_string(),
            branch: "main".to_string(),
            container: container_name(&project),
            project,
            remote,
            port: Self::DEFAULT_PORT,
            token: None,
            workdir: PathBuf::from("."),
            health_grace: Self::DEFAULT_HEALTH_GRACE,
        }
    }

    #[must_use]
    pub fn branch(mut self, branch: &str) -> Self {
        self.branch = branch.to_string();
        self
    }

    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    #[must_use]
    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = dir.into();
        self
    }

    #[must_use]
    pub const fn health_grace(mut self, grace: Duration) -> Self {
        self.health_grace = grace;
        self
    }

    /// Clone URL with the token embedded as the userinfo part, or
    /// the plain URL when no token is held.
    #[must_use]
    pub fn authenticated_url(&self) -> SecretString {
        let rest = self
            .repo_url
            .strip_prefix("https://")
            .unwrap_or(&self.repo_url);
        match &self.token {
            Some(token) => SecretString::from(format!("https://{}@{rest}", token.expose_secret())),
            None => SecretString::from(self.repo_url.as_str()),
        }
    }

    /// Local checkout directory.
    #[must_use]
    pub fn local_dir(&self) -> PathBuf {
        self.workdir.join(&self.project)
    }

    /// Remote directory the checkout is copied into, ready for a
    /// remote shell: `~` stays expandable, the name is quoted.
    #[must_use]
    pub fn remote_dir(&self) -> String {
        format!("~/{}", quote(&self.project))
    }

    /// Image tag. Docker repository names must be lowercase.
    #[must_use]
    pub fn image(&self) -> String {
        format!("{}:latest", self.project.to_lowercase())
    }

    /// Drop the token; its buffer is zeroed. Safe to call more than
    /// once.
    pub fn clear_credential(&mut self) {
        self.token = None;
    }
}

/// Last path segment of the repository URL without `.git`.
#[must_use]
pub fn project_name(repo_url: &str) -> String {
    let last = repo_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(repo_url);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

#[must_use]
pub fn container_name(project: &str) -> String {
    format!("{project}_app")
}

/// Defaults read from a YAML file. Every field is optional; the
/// token is deliberately absent.
///
/// ```yaml
/// repo: https://github.com/acme/shop.git
/// branch: release
/// user: ubuntu
/// host: 203.0.113.7
/// key: ~/.ssh/id_ed25519
/// port: 8080
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub key: Option<String>,
    pub port: Option<u16>,
    pub health_grace_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub log_dir: Option<PathBuf>,
}

impl FileConfig {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid
    /// YAML for this schema.
    pub fn load(path: &Path) -> DeployResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed YAML or unknown fields.
    pub fn parse(content: &str) -> DeployResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote() -> RemoteHost {
        RemoteHost::new("203.0.113.7", "ubuntu")
    }

    #[test]
    fn derived_names() {
        let config = DeploymentConfig::new("https://example.com/myapp.git", remote());

        assert_eq!(config.project, "myapp");
        assert_eq!(config.container, "myapp_app");
        assert_eq!(config.image(), "myapp:latest");
        assert_eq!(config.local_dir(), PathBuf::from("./myapp"));
    }

    #[test]
    fn project_name_from_nested_path() {
        assert_eq!(project_name("https://github.com/acme/tools/api.git"), "api");
        assert_eq!(project_name("https://github.com/acme/web"), "web");
    }

    #[test]
    fn authenticated_url_embeds_token() {
        let config = DeploymentConfig::new("https://github.com/acme/web.git", remote())
            .token(SecretString::from("ghp_x"));

        assert_eq!(
            config.authenticated_url().expose_secret(),
            "https://ghp_x@github.com/acme/web.git"
        );
    }

    #[test]
    fn clear_credential_wipes_token() {
        let mut config = DeploymentConfig::new("https://github.com/acme/web.git", remote())
            .token(SecretString::from("ghp_x"));
        config.clear_credential();

        assert!(config.token.is_none());
        assert_eq!(
            config.authenticated_url().expose_secret(),
            "https://github.com/acme/web.git"
        );
    }

    #[test]
    fn image_tag_is_lowercase() {
        let config = DeploymentConfig::new("https://github.com/acme/MyApp.git", remote());

        assert_eq!(config.project, "MyApp");
        assert_eq!(config.container, "MyApp_app");
        assert_eq!(config.image(), "myapp:latest");
    }

    #[test]
    fn remote_dir_quotes_unusual_names() {
        let config = DeploymentConfig::new("https://github.com/acme/x;id.git", remote());

        assert_eq!(config.remote_dir(), "~/'x;id'");
    }

    #[test]
    fn file_config_parses_partial_yaml() {
        let cfg = FileConfig::parse("host: 10.0.0.2\nport: 8080\n").unwrap();

        assert_eq!(cfg.host.as_deref(), Some("10.0.0.2"));
        assert_eq!(cfg.port, Some(8080));
        assert!(cfg.repo.is_none());
    }

    #[test]
    fn file_config_rejects_token_field() {
        assert!(FileConfig::parse("token: abc\n").is_err());
    }
}
