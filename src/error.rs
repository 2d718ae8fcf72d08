pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("SSH connection failed: {0}")]
    SshFailed(String),

    #[error("repository access failed: {0}. Check the repository URL and token")]
    RepoAccess(String),

    #[error("repository sync failed: {0}")]
    RepoSync(String),

    #[error("provisioning failed: {0}")]
    ProvisionFailed(String),

    #[error("no build specification found in {0} (expected docker-compose.yml, docker-compose.yaml or Dockerfile)")]
    NoBuildSpec(String),

    #[error("deployment failed: {0}")]
    DeployFailed(String),

    #[error("nginx configuration rejected: {0}")]
    ProxyConfigInvalid(String),

    #[error("container '{0}' is not running")]
    ContainerNotRunning(String),

    #[error("command failed: {command}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl From<dialoguer::Error> for DeployError {
    fn from(err: dialoguer::Error) -> Self {
        Self::Prompt(err.to_string())
    }
}
